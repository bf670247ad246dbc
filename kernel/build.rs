//! Kestrel 构建脚本
//!
//! 这个脚本在编译前运行，负责：
//! 1. 解析 Kernel.toml 配置文件
//! 2. 生成 src/config.rs 常量
//! 3. 校验调度器参数的取值范围

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=../Kernel.toml");

    let config_content = fs::read_to_string("../Kernel.toml")
        .expect("无法读取 Kernel.toml");
    let config: toml::Value = toml::from_str(&config_content)
        .expect("配置文件解析失败");

    if let Some(general) = config.get("general") {
        if let Some(name) = general.get("name").and_then(|v| v.as_str()) {
            println!("cargo:rustc-env=CARGO_KERNEL_NAME={}", name);
        }
        if let Some(version) = general.get("version").and_then(|v| v.as_str()) {
            println!("cargo:rustc-env=CARGO_KERNEL_VERSION={}", version);
        }
    }

    generate_config_code(&config);
}

/// 读取 `[section] key` 整数项，缺省时返回 `default`
fn int(config: &toml::Value, section: &str, key: &str, default: i64) -> i64 {
    config.get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_integer())
        .unwrap_or(default)
}

fn string<'a>(config: &'a toml::Value, section: &str, key: &str, default: &'a str) -> &'a str {
    config.get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or(default)
}

fn generate_config_code(config: &toml::Value) {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR 未设置"));

    let kernel_name = string(config, "general", "name", "Kestrel");
    let kernel_version = string(config, "general", "version", "0.1.0");

    let pri_min = int(config, "priority", "min", 0);
    let pri_default = int(config, "priority", "default", 31);
    let pri_max = int(config, "priority", "max", 63);
    assert!(pri_min <= pri_default && pri_default <= pri_max, "priority 配置越界");

    let nice_min = int(config, "nice", "min", -20);
    let nice_default = int(config, "nice", "default", 0);
    let nice_max = int(config, "nice", "max", 20);
    assert!(nice_min <= nice_default && nice_default <= nice_max, "nice 配置越界");

    let time_slice = int(config, "scheduler", "time_slice", 4);
    let timer_freq = int(config, "scheduler", "timer_freq", 100);
    let max_threads = int(config, "scheduler", "max_threads", 64);
    let donation_depth = int(config, "scheduler", "donation_depth", 8);
    assert!(time_slice > 0 && timer_freq > 0 && max_threads >= 2, "scheduler 配置非法");

    let enable_mlfqs = match string(config, "scheduler", "policy", "priority") {
        "priority" => false,
        "mlfqs" => true,
        other => panic!("未知的调度策略: {}", other),
    };

    let name_max = int(config, "thread", "name_max", 16);

    let config_header = format!(
        r#"//! Kestrel 内核配置（自动生成）
//!
//! 此文件由 build.rs 根据 Kernel.toml 自动生成，请勿手动修改

// ============================================================
// 基本信息
// ============================================================

/// 内核名称
pub const KERNEL_NAME: &str = "{}";

/// 内核版本
pub const KERNEL_VERSION: &str = "{}";

// ============================================================
// 优先级配置
// ============================================================

/// 最低优先级
pub const PRI_MIN: i32 = {};

/// 默认优先级
pub const PRI_DEFAULT: i32 = {};

/// 最高优先级
pub const PRI_MAX: i32 = {};

/// 最小 nice 值
pub const NICE_MIN: i32 = {};

/// 默认 nice 值
pub const NICE_DEFAULT: i32 = {};

/// 最大 nice 值
pub const NICE_MAX: i32 = {};

// ============================================================
// 调度器配置
// ============================================================

/// 时间片滴答数
pub const TIME_SLICE_TICKS: u32 = {};

/// 每秒时钟中断次数
pub const TIMER_FREQ: i64 = {};

/// 线程描述符上限
pub const MAX_THREADS: usize = {};

/// 优先级捐赠链最大深度
pub const DONATION_MAX_DEPTH: usize = {};

/// 默认是否启用 MLFQS
pub const ENABLE_MLFQS: bool = {};

// ============================================================
// 线程配置
// ============================================================

/// 线程名缓冲区长度（含结尾 NUL）
pub const THREAD_NAME_MAX: usize = {};
"#,
        kernel_name,
        kernel_version,
        pri_min,
        pri_default,
        pri_max,
        nice_min,
        nice_default,
        nice_max,
        time_slice,
        timer_freq,
        max_threads,
        donation_depth,
        enable_mlfqs,
        name_max,
    );

    let config_file = manifest_dir.join("src").join("config.rs");

    // 只有内容变化时才写入，避免每次编译都更新文件时间戳
    let existing_content = fs::read_to_string(&config_file).unwrap_or_default();
    if existing_content != config_header {
        fs::write(&config_file, &config_header)
            .expect("写入配置文件失败");
    }
}
