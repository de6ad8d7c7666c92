// crates/crm_turbulence/src/diagnostics.rs

//! TKE 收支诊断
//!
//! 每次调用重新累加四个逐层逐列的诊断量：
//!
//! | 名称 | 含义 |
//! |------|------|
//! | `tkelediss` | −Σ 剪切产生 / (nx·ny)（水平平均的能量损失） |
//! | `tkesbdiss` | Σ 耗散 |
//! | `tkesbshear` | Σ 剪切产生 |
//! | `tkesbbuoy` | Σ 浮力产生 |
//!
//! 各层并行写入同一 `(k, icrm)` 单元，因此使用原子累加器。

use crate::closure::CellUpdate;
use crate::context::ColumnGeometry;
use crm_foundation::{CrmError, CrmResult, Profile};
use std::sync::atomic::{AtomicU64, Ordering};

/// 逐层逐列收支诊断，形状 `(nz, ncrms)`，顶层不写入
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureDiagnostics {
    /// 水平平均剪切产生的负值
    pub tkelediss: Profile,
    /// 耗散
    pub tkesbdiss: Profile,
    /// 剪切产生
    pub tkesbshear: Profile,
    /// 浮力产生
    pub tkesbbuoy: Profile,
}

impl ClosureDiagnostics {
    /// 零初始化
    pub fn new(geometry: &ColumnGeometry) -> Self {
        let dims = [geometry.nz(), geometry.ncrms];
        Self {
            tkelediss: Profile::zeros(dims),
            tkesbdiss: Profile::zeros(dims),
            tkesbshear: Profile::zeros(dims),
            tkesbbuoy: Profile::zeros(dims),
        }
    }

    /// 校验形状
    pub fn validate(&self, geometry: &ColumnGeometry) -> CrmResult<()> {
        let dims = [geometry.nz(), geometry.ncrms];
        CrmError::check_shape("tkelediss", &dims, &self.tkelediss.dims())?;
        CrmError::check_shape("tkesbdiss", &dims, &self.tkesbdiss.dims())?;
        CrmError::check_shape("tkesbshear", &dims, &self.tkesbshear.dims())?;
        CrmError::check_shape("tkesbbuoy", &dims, &self.tkesbbuoy.dims())
    }
}

/// 四个诊断量的全域总和
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BudgetTotals {
    /// Σ tkelediss
    pub lediss: f64,
    /// Σ tkesbdiss
    pub diss: f64,
    /// Σ tkesbshear
    pub shear: f64,
    /// Σ tkesbbuoy
    pub buoy: f64,
}

/// 原子收支累加器
///
/// 浮点数以位模式存入 `AtomicU64`，加法用 compare-exchange 循环实现。
pub struct BudgetAccumulator {
    ncrms: usize,
    lediss: Vec<AtomicU64>,
    diss: Vec<AtomicU64>,
    shear: Vec<AtomicU64>,
    buoy: Vec<AtomicU64>,
}

impl BudgetAccumulator {
    /// 创建 `(nz, ncrms)` 累加器
    pub fn new(geometry: &ColumnGeometry) -> Self {
        let n = geometry.nz() * geometry.ncrms;
        let zeros = || (0..n).map(|_| AtomicU64::new(0)).collect::<Vec<_>>();
        Self {
            ncrms: geometry.ncrms,
            lediss: zeros(),
            diss: zeros(),
            shear: zeros(),
            buoy: zeros(),
        }
    }

    /// 清零
    pub fn reset(&self) {
        // 0.0 的位模式为 0
        for cell in self
            .lediss
            .iter()
            .chain(&self.diss)
            .chain(&self.shear)
            .chain(&self.buoy)
        {
            cell.store(0, Ordering::Relaxed);
        }
    }

    #[inline]
    fn atomic_add(atomic: &AtomicU64, val: f64) {
        let mut old = atomic.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(old) + val).to_bits();
            match atomic.compare_exchange_weak(old, new, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(x) => old = x,
            }
        }
    }

    /// 累加一个单元的收支（线程安全）
    #[inline]
    pub fn accumulate(&self, k: usize, icrm: usize, update: &CellUpdate, n_horizontal: usize) {
        let idx = k * self.ncrms + icrm;
        Self::atomic_add(&self.lediss[idx], -update.a_prod_sh / n_horizontal as f64);
        Self::atomic_add(&self.diss[idx], update.a_diss);
        Self::atomic_add(&self.shear[idx], update.a_prod_sh);
        Self::atomic_add(&self.buoy[idx], update.a_prod_bu);
    }

    fn load(cells: &[AtomicU64]) -> Vec<f64> {
        cells
            .iter()
            .map(|a| f64::from_bits(a.load(Ordering::Relaxed)))
            .collect()
    }

    fn sum(cells: &[AtomicU64]) -> f64 {
        cells
            .iter()
            .map(|a| f64::from_bits(a.load(Ordering::Relaxed)))
            .sum()
    }

    /// 写出到诊断量（覆盖原值）
    pub fn collect_into(&self, diagnostics: &mut ClosureDiagnostics) {
        diagnostics.tkelediss.as_mut_slice().copy_from_slice(&Self::load(&self.lediss));
        diagnostics.tkesbdiss.as_mut_slice().copy_from_slice(&Self::load(&self.diss));
        diagnostics.tkesbshear.as_mut_slice().copy_from_slice(&Self::load(&self.shear));
        diagnostics.tkesbbuoy.as_mut_slice().copy_from_slice(&Self::load(&self.buoy));
    }

    /// 全域总和
    pub fn totals(&self) -> BudgetTotals {
        BudgetTotals {
            lediss: Self::sum(&self.lediss),
            diss: Self::sum(&self.diss),
            shear: Self::sum(&self.shear),
            buoy: Self::sum(&self.buoy),
        }
    }
}
