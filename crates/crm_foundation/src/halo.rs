// crates/crm_foundation/src/halo.rs

//! 水平 halo 偏移
//!
//! 动力核心维护的场在水平方向带有 ghost/halo 单元。闭合核心只通过
//! 偏移量写内部点：内部点 `(j, i)` 存放在 `(j + y, i + x)`。
//! halo 在两侧对称，带 halo 的水平范围为 `n + 2·off`。

use serde::{Deserialize, Serialize};

/// 水平 halo 偏移 `(offy, offx)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HaloOffset {
    /// y 方向偏移
    #[serde(default)]
    pub y: usize,
    /// x 方向偏移
    #[serde(default)]
    pub x: usize,
}

impl HaloOffset {
    /// 无 halo
    pub const NONE: Self = Self { y: 0, x: 0 };

    /// 创建偏移
    pub const fn new(y: usize, x: usize) -> Self {
        Self { y, x }
    }

    /// 内部点映射到存储位置
    #[inline]
    pub fn apply(&self, j: usize, i: usize) -> (usize, usize) {
        (j + self.y, i + self.x)
    }

    /// 带 halo 的水平范围 `(ny + 2·y, nx + 2·x)`
    #[inline]
    pub fn padded_extent(&self, ny: usize, nx: usize) -> (usize, usize) {
        (ny + 2 * self.y, nx + 2 * self.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_offset() {
        let halo = HaloOffset::new(1, 2);
        assert_eq!(halo.apply(0, 0), (1, 2));
        assert_eq!(halo.apply(3, 4), (4, 6));
    }

    #[test]
    fn test_padded_extent() {
        assert_eq!(HaloOffset::NONE.padded_extent(4, 8), (4, 8));
        assert_eq!(HaloOffset::new(1, 3).padded_extent(4, 8), (6, 14));
    }

    #[test]
    fn test_serde_defaults() {
        let halo: HaloOffset = serde_json::from_str(r#"{"x": 2}"#).unwrap();
        assert_eq!(halo, HaloOffset::new(0, 2));
    }
}
