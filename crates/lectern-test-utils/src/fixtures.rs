use anyhow::Result;
use image::{ImageFormat, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestFixtures {
    temp_dir: TempDir,
}

impl TestFixtures {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn create_test_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let file_path = self.temp_dir.path().join(name);
        std::fs::write(&file_path, content)?;
        Ok(file_path)
    }

    /// Write a two-tone PNG of the given size
    pub fn create_test_png(&self, name: &str, width: u32, height: u32) -> Result<PathBuf> {
        let file_path = self.temp_dir.path().join(name);
        let img = RgbaImage::from_fn(width, height, |x, _| {
            if x % 2 == 0 {
                Rgba([65, 105, 225, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        img.save_with_format(&file_path, ImageFormat::Png)?;
        Ok(file_path)
    }

    /// Names of the entries currently in the fixture directory
    pub fn entries(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.temp_dir.path())? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

// Common test data
pub mod data {
    pub const TWO_BLOCKS: &str = "# Demo\n\nSome prose.\n\n```bash\necho one\n```\n\nMore prose.\n\n~~~python\nprint(\"two\")\n~~~\n";

    pub const ANNOTATED: &str = "```go\npackage main\n\nfunc main() {\n/// fmt.Println(\"hidden\")\n}\n```\n";

    pub const NO_CODE: &str = "# Title\n\nJust some text, no code here.\n";

    pub fn fenced(language: &str, body: &str) -> String {
        format!("```{language}\n{body}\n```\n")
    }
}
