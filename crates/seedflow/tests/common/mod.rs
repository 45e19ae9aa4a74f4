use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const VALID_BOOTSTRAP: &str = r#"
organization "123456789012"
folder "987654321098"
billing-account "01ABCD-234567-89EFAB"
domain "example.com"
repository "my-org/infra"
project "acme"
region "asia-northeast1"
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    /// 有効な bootstrap.kdl を書いたプロジェクト
    pub fn with_valid_config() -> Self {
        let project = Self::new();
        project.write_bootstrap_kdl(VALID_BOOTSTRAP);
        project
    }

    pub fn write_bootstrap_kdl(&self, content: &str) {
        fs::write(self.bootstrap_path(), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_state(&self, content: &str) {
        let dir = self.root.path().join(".seedflow");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("state.json"), content).unwrap();
    }

    pub fn bootstrap_path(&self) -> PathBuf {
        self.root.path().join("bootstrap.kdl")
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
