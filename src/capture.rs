//! Output Capture Region
//!
//! Everything a template writes lands in the region's buffer. Nothing is
//! visible outside until `finish` hands the text back; a region dropped
//! without `finish` (error path, panic) throws its partial output away.

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct CaptureRegion {
    template: PathBuf,
    buffer: String,
    finished: bool,
}

impl CaptureRegion {
    pub fn begin(template: &Path) -> Self {
        tracing::trace!(template = %template.display(), "capture region opened");
        Self {
            template: template.to_path_buf(),
            buffer: String::new(),
            finished: false,
        }
    }

    /// Bytes captured so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Close the region and take the captured text.
    pub fn finish(mut self) -> String {
        self.finished = true;
        std::mem::take(&mut self.buffer)
    }
}

impl fmt::Write for CaptureRegion {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.push_str(s);
        Ok(())
    }
}

impl Drop for CaptureRegion {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                template = %self.template.display(),
                discarded_bytes = self.buffer.len(),
                "capture region abandoned"
            );
            self.buffer.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_finish_returns_everything_written() {
        let mut region = CaptureRegion::begin(Path::new("views/a.html"));
        write!(region, "<p>{}</p>", 42).unwrap();
        region.write_str("tail").unwrap();
        assert_eq!(region.len(), 13);
        assert_eq!(region.finish(), "<p>42</p>tail");
    }

    #[test]
    fn test_abandoned_region_yields_nothing() {
        fn failing_stage(out: &mut CaptureRegion) -> Result<(), ()> {
            out.write_str("partial").map_err(|_| ())?;
            Err(())
        }

        let result = {
            let mut region = CaptureRegion::begin(Path::new("views/b.html"));
            failing_stage(&mut region).map(|_| region.finish())
        };
        assert!(result.is_err());
    }
}
