//! Kestrel 内核配置（自动生成）
//!
//! 此文件由 build.rs 根据 Kernel.toml 自动生成，请勿手动修改

// ============================================================
// 基本信息
// ============================================================

/// 内核名称
pub const KERNEL_NAME: &str = "Kestrel";

/// 内核版本
pub const KERNEL_VERSION: &str = "0.1.0";

// ============================================================
// 优先级配置
// ============================================================

/// 最低优先级
pub const PRI_MIN: i32 = 0;

/// 默认优先级
pub const PRI_DEFAULT: i32 = 31;

/// 最高优先级
pub const PRI_MAX: i32 = 63;

/// 最小 nice 值
pub const NICE_MIN: i32 = -20;

/// 默认 nice 值
pub const NICE_DEFAULT: i32 = 0;

/// 最大 nice 值
pub const NICE_MAX: i32 = 20;

// ============================================================
// 调度器配置
// ============================================================

/// 时间片滴答数
pub const TIME_SLICE_TICKS: u32 = 4;

/// 每秒时钟中断次数
pub const TIMER_FREQ: i64 = 100;

/// 线程描述符上限
pub const MAX_THREADS: usize = 64;

/// 优先级捐赠链最大深度
pub const DONATION_MAX_DEPTH: usize = 8;

/// 默认是否启用 MLFQS
pub const ENABLE_MLFQS: bool = false;

// ============================================================
// 线程配置
// ============================================================

/// 线程名缓冲区长度（含结尾 NUL）
pub const THREAD_NAME_MAX: usize = 16;
