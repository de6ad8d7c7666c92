// crates/crm_foundation/src/lib.rs

//! CRM Foundation Layer
//!
//! 湍流闭合工作区的基础层。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型
//! - [`field`]: 行主序稠密网格场
//! - [`halo`]: 水平 halo 偏移
//!
//! # 示例
//!
//! ```
//! use crm_foundation::{Field4, HaloOffset};
//!
//! let mut tabs = Field4::filled([3, 1, 1, 1], 290.0);
//! tabs[[0, 0, 0, 0]] = 300.0;
//! assert_eq!(tabs.max(), Some(300.0));
//!
//! let halo = HaloOffset::new(1, 1);
//! assert_eq!(halo.apply(0, 0), (1, 1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod field;
pub mod halo;

// 重导出常用类型
pub use error::{CrmError, CrmResult};
pub use field::{Field, Field4, Field5, Profile, Surface};
pub use halo::HaloOffset;
