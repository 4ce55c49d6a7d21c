use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Default)]
struct ConfigSection {
    min_span_size: Option<usize>,
    poison_byte: Option<u8>,
}

#[derive(Deserialize, Default)]
struct Config {
    #[serde(default)]
    config: ConfigSection,
}

struct ResolvedConfig {
    min_span_size: usize,
    poison_byte: u8,
}

fn resolve_config(cfg: &ConfigSection) -> ResolvedConfig {
    let min_span_size = cfg.min_span_size.unwrap_or(65536);
    assert!(
        min_span_size.is_power_of_two(),
        "min_span_size ({}) must be a power of 2",
        min_span_size
    );
    assert!(
        min_span_size >= 65536,
        "min_span_size ({}) must be >= 65536",
        min_span_size
    );

    ResolvedConfig {
        min_span_size,
        poison_byte: cfg.poison_byte.unwrap_or(0xAE),
    }
}

fn default_config_path() -> String {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    format!("{}/btmalloc.toml", manifest_dir)
}

fn generate_config(cfg: &ResolvedConfig, out_path: &Path) {
    let code = format!(
        "// Auto-generated by build.rs. Do not edit.\n\n\
         pub const MIN_SPAN_SIZE: usize = {};\n\
         pub const POISON_BYTE: u8 = {:#04x};\n",
        cfg.min_span_size, cfg.poison_byte,
    );
    fs::write(out_path, code).expect("failed to write config_gen.rs");
}

fn main() {
    println!("cargo:rerun-if-env-changed=BTMALLOC_CONFIG");

    let out_dir = env::var("OUT_DIR").unwrap();

    let config_path = env::var("BTMALLOC_CONFIG").unwrap_or_else(|_| default_config_path());
    println!("cargo:rerun-if-changed={}", config_path);

    // The shipped btmalloc.toml spells out the defaults; a missing file is
    // equivalent to an empty one.
    let config: Config = match fs::read_to_string(&config_path) {
        Ok(content) => toml::from_str(&content).expect("failed to parse TOML config"),
        Err(_) => Config::default(),
    };

    let resolved = resolve_config(&config.config);
    generate_config(&resolved, &Path::new(&out_dir).join("config_gen.rs"));
}
