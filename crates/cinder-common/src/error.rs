//! Error types for Cinder.

use crate::page::PageId;
use thiserror::Error;

/// Result type alias using CinderError.
pub type Result<T> = std::result::Result<T, CinderError>;

/// Errors that can occur in Cinder operations.
#[derive(Debug, Error)]
pub enum CinderError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Storage backend errors
    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: PageId },

    // Buffer pool errors
    #[error("Buffer pool exhausted, all frames pinned or in use")]
    PoolExhausted,

    #[error("Page {page_id} in frame {frame} is not pinned")]
    PageNotPinned { page_id: PageId, frame: u32 },

    #[error("Page {page_id} of {file} is still pinned in frame {frame}")]
    PagePinned {
        file: String,
        page_id: PageId,
        frame: u32,
    },

    #[error("Frame {frame} descriptor is corrupt (dirty: {dirty}, ref bit: {ref_bit})")]
    FrameCorrupted {
        frame: u32,
        dirty: bool,
        ref_bit: bool,
    },

    // Page table errors
    #[error("Page {page_id} is already mapped to a frame")]
    DuplicateMapping { page_id: PageId },

    #[error("Page {page_id} has no frame mapping")]
    MappingNotFound { page_id: PageId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: CinderError = io_err.into();
        assert!(matches!(err, CinderError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_page_not_found_display() {
        let err = CinderError::PageNotFound {
            page_id: PageId::new(0, 42),
        };
        assert_eq!(err.to_string(), "Page not found: 0:42");
    }

    #[test]
    fn test_pool_exhausted_display() {
        let err = CinderError::PoolExhausted;
        assert_eq!(
            err.to_string(),
            "Buffer pool exhausted, all frames pinned or in use"
        );
    }

    #[test]
    fn test_page_not_pinned_display() {
        let err = CinderError::PageNotPinned {
            page_id: PageId::new(1, 7),
            frame: 3,
        };
        assert_eq!(err.to_string(), "Page 1:7 in frame 3 is not pinned");
    }

    #[test]
    fn test_page_pinned_display() {
        let err = CinderError::PagePinned {
            file: "data/00000000.dat".to_string(),
            page_id: PageId::new(0, 9),
            frame: 2,
        };
        assert_eq!(
            err.to_string(),
            "Page 0:9 of data/00000000.dat is still pinned in frame 2"
        );
    }

    #[test]
    fn test_frame_corrupted_display() {
        let err = CinderError::FrameCorrupted {
            frame: 5,
            dirty: true,
            ref_bit: false,
        };
        assert_eq!(
            err.to_string(),
            "Frame 5 descriptor is corrupt (dirty: true, ref bit: false)"
        );
    }

    #[test]
    fn test_mapping_errors_display() {
        let err = CinderError::DuplicateMapping {
            page_id: PageId::new(0, 1),
        };
        assert_eq!(err.to_string(), "Page 0:1 is already mapped to a frame");

        let err = CinderError::MappingNotFound {
            page_id: PageId::new(0, 1),
        };
        assert_eq!(err.to_string(), "Page 0:1 has no frame mapping");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(CinderError::PoolExhausted)
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CinderError>();
    }
}
