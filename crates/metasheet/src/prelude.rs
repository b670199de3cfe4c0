//! Prelude module - common imports for metasheet users
//!
//! ```rust
//! use metasheet::prelude::*;
//! ```

pub use crate::{
    // Entry points
    combine,
    export,
    scan,

    CellValue,
    CombineOptions,
    CombineReport,
    // Error types
    Error,
    ExportOptions,
    ExportTarget,
    GroupReport,
    GroupWarning,
    // Layout
    LayoutConfig,
    ProgressSink,
    Result,
    ScanMode,
    SheetRole,
    SheetRule,
    Workbook,
    Worksheet,
};
