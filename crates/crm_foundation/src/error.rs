// crates/crm_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `CrmError` 枚举和 `CrmResult` 类型别名。
//!
//! 湍流闭合核心本身没有数值错误路径（所有约束通过截断实现），
//! 这里的错误只覆盖入口处的形状校验与索引问题。
//!
//! # 示例
//!
//! ```
//! use crm_foundation::error::{CrmError, CrmResult};
//!
//! fn check_levels(nzm: usize) -> CrmResult<()> {
//!     if nzm < 2 {
//!         return Err(CrmError::invalid_input("至少需要两个垂直层"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_levels(1).is_err());
//! ```

use thiserror::Error;

/// 统一结果类型
pub type CrmResult<T> = Result<T, CrmError>;

/// CRM 工作区错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrmError {
    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 网格维度不匹配
    #[error("网格维度不匹配: {name} 期望{expected:?}, 实际{actual:?}")]
    ShapeMismatch {
        /// 场名称
        name: &'static str,
        /// 期望维度
        expected: Vec<usize>,
        /// 实际维度
        actual: Vec<usize>,
    },

    /// 索引越界
    #[error("索引越界: {index_type} 索引 {index} 超出范围 0..{len}")]
    IndexOutOfBounds {
        /// 索引类别描述
        index_type: &'static str,
        /// 访问的索引
        index: usize,
        /// 上界（长度）
        len: usize,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl CrmError {
    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 网格维度不匹配
    pub fn shape_mismatch(name: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            name,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// 索引越界
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl CrmError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> CrmResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查网格维度是否匹配
    #[inline]
    pub fn check_shape(name: &'static str, expected: &[usize], actual: &[usize]) -> CrmResult<()> {
        if expected != actual {
            Err(Self::shape_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查索引是否在范围内
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> CrmResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CrmError::size_mismatch("dz", 4, 3);
        assert!(err.to_string().contains("dz"));
        assert!(CrmError::invalid_input("nzm = 0").to_string().contains("nzm = 0"));
    }

    #[test]
    fn test_index_out_of_bounds() {
        let err = CrmError::index_out_of_bounds("level", 10, 5);
        assert!(err.to_string().contains("level"));
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn test_check_size() {
        assert!(CrmError::check_size("dz", 4, 4).is_ok());
        assert!(CrmError::check_size("dz", 4, 3).is_err());
    }

    #[test]
    fn test_check_shape() {
        assert!(CrmError::check_shape("tabs", &[3, 1, 2, 1], &[3, 1, 2, 1]).is_ok());
        let err = CrmError::check_shape("tabs", &[3, 1, 2, 1], &[3, 1, 1, 1]).unwrap_err();
        assert!(matches!(err, CrmError::ShapeMismatch { name: "tabs", .. }));
    }

    #[test]
    fn test_check_index() {
        assert!(CrmError::check_index("field", 0, 1).is_ok());
        assert!(CrmError::check_index("field", 1, 1).is_err());
    }
}
