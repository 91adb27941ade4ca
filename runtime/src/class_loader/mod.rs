use crate::debug_log;
use crate::error::JvmError;
use std::path::PathBuf;

/// Bootstrap class loader: finds `name + ".class"` in the classpath
/// directories and hands the raw bytes to the reader. Class-file memory is
/// owned by the parsed class for the process lifetime.
pub struct ClassLoader {
    class_path: Vec<PathBuf>,
}

impl ClassLoader {
    pub fn new(class_path: &[String]) -> Self {
        let class_path = class_path.iter().map(PathBuf::from).collect();
        Self { class_path }
    }

    pub fn load(&self, name: &str) -> Result<Vec<u8>, JvmError> {
        let file_name = format!("{}.class", name);
        for dir in &self.class_path {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                debug_log!("Reading class file {:?}", candidate);
                return std::fs::read(&candidate).map_err(|e| {
                    JvmError::ClassFormat(format!("could not read {:?}: {}", candidate, e))
                });
            }
        }
        Err(JvmError::ClassNotFoundOnClasspath(name.to_string()))
    }
}
