//! Resource - 配置文档的字节来源抽象
//!
//! 读取器只依赖 [`Resource`] 与 [`ResourceLoader`] 两个接口：打开字节流、
//! 解析相对路径、生成描述信息以及把位置字符串转换为资源。

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::error::{CoreError, CoreResult};
use crate::utils::paths;

/// 类路径资源前缀
pub const CLASSPATH_URL_PREFIX: &str = "classpath:";

/// 文件 URL 前缀
pub const FILE_URL_PREFIX: &str = "file:";

/// 一个可打开的、具名的字节来源
pub trait Resource: Send + Sync + fmt::Debug {
    /// 资源是否真实存在
    fn exists(&self) -> bool;

    /// 打开字节流
    fn open_read(&self) -> CoreResult<Box<dyn Read + Send>>;

    /// 资源对应的 URL
    fn url(&self) -> CoreResult<Url>;

    /// 创建相对于当前资源的资源
    fn create_relative(&self, relative_path: &str) -> CoreResult<Arc<dyn Resource>>;

    /// 文件名（如果有）
    fn filename(&self) -> Option<String> {
        None
    }

    /// 用于错误信息的描述
    fn description(&self) -> String;

    /// 判等标识：解析后的路径
    fn resolved_path(&self) -> String;

    /// 读取全部内容为 UTF-8 字符串
    fn read_to_string(&self) -> CoreResult<String> {
        let mut content = String::new();
        self.open_read()?
            .read_to_string(&mut content)
            .map_err(|e| CoreError::io(self.description(), e))?;
        Ok(content)
    }
}

impl PartialEq for dyn Resource {
    fn eq(&self, other: &Self) -> bool {
        self.resolved_path() == other.resolved_path()
    }
}

impl fmt::Display for dyn Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// 判断位置字符串是否为带协议的 URL（包括 `classpath:`）
///
/// 单字母协议被视为 Windows 盘符而非 URL。
pub fn is_url(location: &str) -> bool {
    if location.starts_with(CLASSPATH_URL_PREFIX) {
        return true;
    }
    Url::parse(location).is_ok_and(|url| url.scheme().len() > 1)
}

fn file_url(path: &Path) -> CoreResult<Url> {
    let absolute = absolute_path(path);
    Url::from_file_path(&absolute).map_err(|_| {
        CoreError::resolution(
            format!("file [{}]", absolute.display()),
            "cannot be converted to a file URL",
        )
    })
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn open_file(path: &Path, description: String) -> CoreResult<Box<dyn Read + Send>> {
    File::open(path)
        .map(|file| Box::new(file) as Box<dyn Read + Send>)
        .map_err(|e| CoreError::io(description, e))
}

// ========== FileSystemResource ==========

/// 文件系统资源，相对路径相对于进程工作目录
#[derive(Debug, Clone)]
pub struct FileSystemResource {
    path: String,
    file_path: PathBuf,
}

impl FileSystemResource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = paths::clean_path(&path.as_ref().to_string_lossy());
        let file_path = PathBuf::from(&path);
        Self { path, file_path }
    }

    /// 规范化后的路径
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Resource for FileSystemResource {
    fn exists(&self) -> bool {
        self.file_path.is_file()
    }

    fn open_read(&self) -> CoreResult<Box<dyn Read + Send>> {
        open_file(&self.file_path, self.description())
    }

    fn url(&self) -> CoreResult<Url> {
        file_url(&self.file_path)
    }

    fn create_relative(&self, relative_path: &str) -> CoreResult<Arc<dyn Resource>> {
        let path = paths::apply_relative_path(&self.path, relative_path);
        Ok(Arc::new(FileSystemResource::new(path)))
    }

    fn filename(&self) -> Option<String> {
        self.file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    fn description(&self) -> String {
        format!("file [{}]", absolute_path(&self.file_path).display())
    }

    fn resolved_path(&self) -> String {
        paths::clean_path(&absolute_path(&self.file_path).to_string_lossy())
    }
}

// ========== ClassPathResource ==========

/// 类路径：按顺序搜索的一组根目录
#[derive(Debug, Clone, Default)]
pub struct ClassPath {
    roots: Arc<Vec<PathBuf>>,
}

impl ClassPath {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: Arc::new(roots.into_iter().map(Into::into).collect()),
        }
    }

    /// 以当前工作目录为唯一根目录
    pub fn current_dir() -> Self {
        Self::new([PathBuf::from(".")])
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// 在根目录中查找第一个存在的文件
    pub fn locate(&self, path: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(path))
            .find(|candidate| candidate.is_file())
    }
}

/// 类路径资源
#[derive(Debug, Clone)]
pub struct ClassPathResource {
    path: String,
    class_path: ClassPath,
}

impl ClassPathResource {
    pub fn new(path: &str, class_path: ClassPath) -> Self {
        let cleaned = paths::clean_path(path);
        let path = cleaned.trim_start_matches('/').to_string();
        Self { path, class_path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Resource for ClassPathResource {
    fn exists(&self) -> bool {
        self.class_path.locate(&self.path).is_some()
    }

    fn open_read(&self) -> CoreResult<Box<dyn Read + Send>> {
        match self.class_path.locate(&self.path) {
            Some(file) => open_file(&file, self.description()),
            None => Err(CoreError::resolution(
                self.description(),
                "cannot be opened because it does not exist",
            )),
        }
    }

    fn url(&self) -> CoreResult<Url> {
        match self.class_path.locate(&self.path) {
            Some(file) => file_url(&file),
            None => Err(CoreError::resolution(
                self.description(),
                "cannot be resolved to URL because it does not exist",
            )),
        }
    }

    fn create_relative(&self, relative_path: &str) -> CoreResult<Arc<dyn Resource>> {
        let path = paths::apply_relative_path(&self.path, relative_path);
        Ok(Arc::new(ClassPathResource::new(&path, self.class_path.clone())))
    }

    fn filename(&self) -> Option<String> {
        paths::filename(&self.path).map(String::from)
    }

    fn description(&self) -> String {
        format!("class path resource [{}]", self.path)
    }

    fn resolved_path(&self) -> String {
        format!("{}{}", CLASSPATH_URL_PREFIX, self.path)
    }
}

// ========== UrlResource ==========

/// URL 资源，目前只能读取 `file:` 协议
#[derive(Debug, Clone)]
pub struct UrlResource {
    url: Url,
}

impl UrlResource {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn parse(location: &str) -> CoreResult<Self> {
        Url::parse(location)
            .map(Self::new)
            .map_err(|source| CoreError::InvalidUrl {
                url: location.to_string(),
                source,
            })
    }

    fn file_path(&self) -> Option<PathBuf> {
        if self.url.scheme() == "file" {
            self.url.to_file_path().ok()
        } else {
            None
        }
    }
}

impl Resource for UrlResource {
    fn exists(&self) -> bool {
        self.file_path().is_some_and(|path| path.is_file())
    }

    fn open_read(&self) -> CoreResult<Box<dyn Read + Send>> {
        match self.file_path() {
            Some(path) => open_file(&path, self.description()),
            None => Err(CoreError::resolution(
                self.description(),
                format!("URL scheme '{}' is not supported for reading", self.url.scheme()),
            )),
        }
    }

    fn url(&self) -> CoreResult<Url> {
        Ok(self.url.clone())
    }

    fn create_relative(&self, relative_path: &str) -> CoreResult<Arc<dyn Resource>> {
        let relative_path = relative_path.trim_start_matches('/');
        self.url
            .join(relative_path)
            .map(|url| Arc::new(UrlResource::new(url)) as Arc<dyn Resource>)
            .map_err(|source| CoreError::InvalidUrl {
                url: relative_path.to_string(),
                source,
            })
    }

    fn filename(&self) -> Option<String> {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .map(String::from)
    }

    fn description(&self) -> String {
        format!("URL [{}]", self.url)
    }

    fn resolved_path(&self) -> String {
        self.url.to_string()
    }
}

// ========== ByteArrayResource ==========

/// 内存中的资源，主要用于程序化注册与测试
#[derive(Clone)]
pub struct ByteArrayResource {
    bytes: Arc<[u8]>,
    description: String,
}

impl ByteArrayResource {
    pub fn new(bytes: impl Into<Vec<u8>>, description: impl Into<String>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
            description: description.into(),
        }
    }
}

impl fmt::Debug for ByteArrayResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteArrayResource")
            .field("description", &self.description)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Resource for ByteArrayResource {
    fn exists(&self) -> bool {
        true
    }

    fn open_read(&self) -> CoreResult<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.bytes.clone())))
    }

    fn url(&self) -> CoreResult<Url> {
        Err(CoreError::resolution(
            self.description(),
            "cannot be resolved to URL",
        ))
    }

    fn create_relative(&self, relative_path: &str) -> CoreResult<Arc<dyn Resource>> {
        Err(CoreError::resolution(
            self.description(),
            format!("cannot create a relative resource for '{}'", relative_path),
        ))
    }

    fn description(&self) -> String {
        format!("Byte array resource [{}]", self.description)
    }

    fn resolved_path(&self) -> String {
        format!("bytes:{}#{}", self.description, self.bytes.len())
    }
}

// ========== ResourceLoader ==========

/// 把位置字符串转换为资源
///
/// `classpath:` 前缀与带协议的 URL 总是按字面解析；其余路径交给
/// [`ResourceLoader::resource_by_path`]，由具体的加载器决定含义。
pub trait ResourceLoader: Send + Sync {
    /// 类路径根目录
    fn class_path(&self) -> &ClassPath;

    /// 不带协议的路径如何解析（默认：类路径）
    fn resource_by_path(&self, path: &str) -> Arc<dyn Resource> {
        Arc::new(ClassPathResource::new(path, self.class_path().clone()))
    }

    /// 解析位置字符串
    fn get_resource(&self, location: &str) -> CoreResult<Arc<dyn Resource>> {
        if let Some(path) = location.strip_prefix(CLASSPATH_URL_PREFIX) {
            return Ok(Arc::new(ClassPathResource::new(path, self.class_path().clone())));
        }
        if location.starts_with('/') || !is_url(location) {
            return Ok(self.resource_by_path(location));
        }
        Ok(Arc::new(UrlResource::parse(location)?))
    }
}

/// 默认加载器：不带协议的路径按类路径解析
#[derive(Debug, Clone, Default)]
pub struct DefaultResourceLoader {
    class_path: ClassPath,
}

impl DefaultResourceLoader {
    pub fn new(class_path: ClassPath) -> Self {
        Self { class_path }
    }
}

impl ResourceLoader for DefaultResourceLoader {
    fn class_path(&self) -> &ClassPath {
        &self.class_path
    }
}

/// 文件系统加载器：不带协议的路径相对于工作目录（或指定的基准目录）
///
/// 开头的 `/` 会被去掉，绝对路径需要使用 `file:` 前缀。
#[derive(Debug, Clone, Default)]
pub struct FileSystemResourceLoader {
    class_path: ClassPath,
    base_dir: Option<PathBuf>,
}

impl FileSystemResourceLoader {
    pub fn new(class_path: ClassPath) -> Self {
        Self {
            class_path,
            base_dir: None,
        }
    }

    /// 以指定目录代替进程工作目录
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }
}

impl ResourceLoader for FileSystemResourceLoader {
    fn class_path(&self) -> &ClassPath {
        &self.class_path
    }

    fn resource_by_path(&self, path: &str) -> Arc<dyn Resource> {
        let path = path.strip_prefix('/').unwrap_or(path);
        match &self.base_dir {
            Some(base) => Arc::new(FileSystemResource::new(base.join(path))),
            None => Arc::new(FileSystemResource::new(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_url() {
        assert!(is_url("classpath:beans.xml"));
        assert!(is_url("file:/tmp/beans.xml"));
        assert!(is_url("https://example.com/beans.xml"));
        assert!(!is_url("beans.xml"));
        assert!(!is_url("conf/beans.xml"));
        assert!(!is_url("C:\\conf\\beans.xml"));
    }

    #[test]
    fn test_file_system_resource_relative() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/root.xml"), "<beans/>").unwrap();
        fs::write(dir.path().join("a/child.xml"), "<beans/>").unwrap();

        let root = FileSystemResource::new(dir.path().join("a/root.xml"));
        let child = root.create_relative("child.xml").unwrap();
        assert!(child.exists());
        assert_eq!(child.filename().as_deref(), Some("child.xml"));
        assert_eq!(child.read_to_string().unwrap(), "<beans/>");

        let missing = root.create_relative("missing.xml").unwrap();
        assert!(!missing.exists());
        assert!(missing.open_read().is_err());
    }

    #[test]
    fn test_class_path_resource_searches_roots_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("beans.xml"), "second").unwrap();

        let class_path = ClassPath::new([first.path(), second.path()]);
        let resource = ClassPathResource::new("/beans.xml", class_path.clone());
        assert_eq!(resource.path(), "beans.xml");
        assert!(resource.exists());
        assert_eq!(resource.read_to_string().unwrap(), "second");
        assert_eq!(resource.description(), "class path resource [beans.xml]");

        fs::write(first.path().join("beans.xml"), "first").unwrap();
        assert_eq!(resource.read_to_string().unwrap(), "first");
    }

    #[test]
    fn test_url_resource_relative_join() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("child.xml"), "<beans/>").unwrap();
        let root = UrlResource::new(Url::from_file_path(dir.path().join("root.xml")).unwrap());
        let child = root.create_relative("child.xml").unwrap();
        assert!(child.exists());
        assert!(!root.exists());
    }

    #[test]
    fn test_resource_equality_by_resolved_path() {
        let a: Arc<dyn Resource> = Arc::new(ClassPathResource::new("conf/../beans.xml", ClassPath::default()));
        let b: Arc<dyn Resource> = Arc::new(ClassPathResource::new("beans.xml", ClassPath::default()));
        assert!(*a == *b);
    }

    #[test]
    fn test_loaders_resolve_bare_paths_differently() {
        let dir = tempfile::tempdir().unwrap();
        let class_path = ClassPath::new([dir.path()]);

        let default_loader = DefaultResourceLoader::new(class_path.clone());
        let resource = default_loader.get_resource("beans.xml").unwrap();
        assert_eq!(resource.description(), "class path resource [beans.xml]");

        let fs_loader = FileSystemResourceLoader::new(class_path).with_base_dir(dir.path());
        let resource = fs_loader.get_resource("/beans.xml").unwrap();
        assert!(resource.description().starts_with("file ["));

        let resource = fs_loader.get_resource("classpath:beans.xml").unwrap();
        assert_eq!(resource.description(), "class path resource [beans.xml]");
    }

    #[test]
    fn test_byte_array_resource_has_no_relatives() {
        let resource = ByteArrayResource::new("<beans/>", "inline");
        assert!(resource.exists());
        assert!(resource.url().is_err());
        assert!(resource.create_relative("other.xml").is_err());
        assert_eq!(resource.read_to_string().unwrap(), "<beans/>");
    }
}
