// crates/crm_foundation/src/field.rs

//! 稠密多维网格场
//!
//! 所有网格量（TKE、涡粘性、热力学场、廓线等）都存储为行主序的
//! 稠密数组，最右侧索引（CRM 实例）变化最快。
//!
//! 第一维称为"外层"：对 4 维场是垂直层，对 5 维场是子场编号。
//! 按外层切片得到的连续块可以直接交给 rayon 的 `par_chunks_mut`
//! 做按层并行。
//!
//! | 别名 | 维度 | 典型用途 |
//! |------|------|----------|
//! | [`Profile`] | `(level, column)` | `adz`, `adzw`, `bet`, `presi`, 诊断量 |
//! | [`Surface`] | `(j, i, column)` | `fluxbt`, `fluxbq`, `tsfc` |
//! | [`Field4`] | `(level, j, i, column)` | `tabs`, `qv`, `def2`, 界面浮力 |
//! | [`Field5`] | `(field, level, j, i, column)` | `tke`, `tk`, `tkh` |

use std::ops::{Index, IndexMut};

/// 行主序稠密场
#[derive(Debug, Clone, PartialEq)]
pub struct Field<const N: usize> {
    dims: [usize; N],
    strides: [usize; N],
    data: Vec<f64>,
}

/// 垂直廓线 `(level, column)`
pub type Profile = Field<2>;
/// 地表场 `(j, i, column)`
pub type Surface = Field<3>;
/// 三维网格场 `(level, j, i, column)`
pub type Field4 = Field<4>;
/// 带子场编号的网格场 `(field, level, j, i, column)`
pub type Field5 = Field<5>;

fn strides_for<const N: usize>(dims: &[usize; N]) -> [usize; N] {
    let mut strides = [1usize; N];
    for d in (0..N.saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * dims[d + 1];
    }
    strides
}

impl<const N: usize> Field<N> {
    /// 创建零初始化的场
    pub fn zeros(dims: [usize; N]) -> Self {
        Self::filled(dims, 0.0)
    }

    /// 创建常数填充的场
    pub fn filled(dims: [usize; N], value: f64) -> Self {
        let len = dims.iter().product();
        Self {
            strides: strides_for(&dims),
            dims,
            data: vec![value; len],
        }
    }

    /// 由索引函数生成场
    pub fn from_fn(dims: [usize; N], mut f: impl FnMut([usize; N]) -> f64) -> Self {
        let mut field = Self::zeros(dims);
        let mut idx = [0usize; N];
        for value in field.data.iter_mut() {
            *value = f(idx);
            // 行主序递增多维索引
            for d in (0..N).rev() {
                idx[d] += 1;
                if idx[d] < dims[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        field
    }

    /// 各维大小
    #[inline]
    pub fn dims(&self) -> [usize; N] {
        self.dims
    }

    /// 多维索引到线性偏移
    #[inline]
    pub fn offset(&self, idx: [usize; N]) -> usize {
        let mut off = 0;
        for d in 0..N {
            debug_assert!(
                idx[d] < self.dims[d],
                "index {} out of bounds in dim {} (len {})",
                idx[d],
                d,
                self.dims[d]
            );
            off += idx[d] * self.strides[d];
        }
        off
    }

    /// 设置所有值
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// 外层（第一维）一个切片的元素数
    #[inline]
    pub fn outer_len(&self) -> usize {
        if N == 0 {
            0
        } else {
            self.strides[0]
        }
    }

    /// 外层第 `n` 个切片
    #[inline]
    pub fn outer(&self, n: usize) -> &[f64] {
        let len = self.outer_len();
        &self.data[n * len..(n + 1) * len]
    }

    /// 外层第 `n` 个可变切片
    #[inline]
    pub fn outer_mut(&mut self, n: usize) -> &mut [f64] {
        let len = self.outer_len();
        &mut self.data[n * len..(n + 1) * len]
    }

    /// 底层数据
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// 底层可变数据
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// 最小值（空场返回 `None`）
    pub fn min(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::min)
    }

    /// 最大值（空场返回 `None`）
    pub fn max(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::max)
    }
}

impl<const N: usize> Index<[usize; N]> for Field<N> {
    type Output = f64;

    #[inline]
    fn index(&self, idx: [usize; N]) -> &f64 {
        &self.data[self.offset(idx)]
    }
}

impl<const N: usize> IndexMut<[usize; N]> for Field<N> {
    #[inline]
    fn index_mut(&mut self, idx: [usize; N]) -> &mut f64 {
        let off = self.offset(idx);
        &mut self.data[off]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let f = Field4::from_fn([2, 3, 4, 5], |[k, j, i, c]| {
            (k * 1000 + j * 100 + i * 10 + c) as f64
        });
        assert_eq!(f.offset([0, 0, 0, 1]), 1);
        assert_eq!(f.offset([0, 0, 1, 0]), 5);
        assert_eq!(f.offset([0, 1, 0, 0]), 20);
        assert_eq!(f.offset([1, 0, 0, 0]), 60);
        assert_eq!(f[[1, 2, 3, 4]], 1234.0);
        assert_eq!(f.outer_len(), 60);
    }

    #[test]
    fn test_outer_slices() {
        let mut f = Field5::zeros([2, 3, 1, 1, 2]);
        f.outer_mut(1).fill(7.0);
        assert!(f.outer(0).iter().all(|&v| v == 0.0));
        assert!(f.outer(1).iter().all(|&v| v == 7.0));
        assert_eq!(f[[1, 2, 0, 0, 1]], 7.0);
    }

    #[test]
    fn test_profile_extrema() {
        let p = Profile::from_fn([3, 2], |[k, _]| (k + 1) as f64);
        assert_eq!(p.dims(), [3, 2]);
        assert_eq!(p[[2, 1]], 3.0);
        assert_eq!(p.min(), Some(1.0));
        assert_eq!(p.max(), Some(3.0));
    }
}
