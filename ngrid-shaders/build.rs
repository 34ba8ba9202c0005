//! Compiles the `.comp` catalog in `shaders/` to SPIR-V and emits a Rust
//! source file in `OUT_DIR` exposing `pub const {NAME}_COMP_SPV: &[u32]`
//! for each one. When the `compile` feature is disabled, or when the
//! native `shaderc` toolchain fails to load on this host, falls back to
//! the pre-compiled header embedded in `src/fallback.rs` and just copies
//! its contents through, so downstream crates always see the same
//! generated-module shape regardless of which path produced it.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const SHADER_NAMES: &[&str] = &[
    "elementwise_binary",
    "elementwise_scalar",
    "elementwise_unary",
    "trig",
    "comparison",
    "activation",
    "fill",
    "random_fill",
    "reduce_local",
    "reduce_global",
    "matmul",
    "hadamard",
    "transpose",
    "concatenate",
    "padding",
    "mirror",
    "subgrid",
    "convolution",
    "pool",
    "sort_brick",
    "lu_pivot",
    "lu_swap",
    "lu_lcol",
    "lu_utrail",
    "tri_inv_lower",
    "tri_inv_upper",
];

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR set by cargo"));
    let shaders_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
    let dest = out_dir.join("shader_catalog.rs");

    println!("cargo:rerun-if-changed=shaders");

    #[cfg(feature = "compile")]
    {
        if compile_all(&shaders_dir, &dest) {
            return;
        }
        println!(
            "cargo:warning=ngrid-shaders: shaderc compilation failed, falling back to pre-embedded SPIR-V"
        );
    }

    write_fallback_shim(&dest);
}

#[cfg(feature = "compile")]
fn compile_all(shaders_dir: &Path, dest: &Path) -> bool {
    let compiler = match shaderc::Compiler::new() {
        Some(c) => c,
        None => return false,
    };
    let mut options = match shaderc::CompileOptions::new() {
        Some(o) => o,
        None => return false,
    };
    options.set_optimization_level(shaderc::OptimizationLevel::Performance);

    let mut out = String::new();
    out.push_str("// Generated by build.rs. Do not edit.\n\n");

    for name in SHADER_NAMES {
        let path = shaders_dir.join(format!("{name}.comp"));
        let source = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(_) => return false,
        };
        let filename = path.to_string_lossy();
        let binary = match compiler.compile_into_spirv(
            &source,
            shaderc::ShaderKind::Compute,
            &filename,
            "main",
            Some(&options),
        ) {
            Ok(b) => b,
            Err(err) => {
                println!("cargo:warning=ngrid-shaders: failed to compile {filename}: {err}");
                return false;
            }
        };
        let words = binary.as_binary();
        let upper = name.to_uppercase();
        out.push_str(&format!(
            "pub const {upper}_COMP_SPV: &[u32] = &{words:?};\n"
        ));
    }

    fs::write(dest, out).is_ok()
}

/// When compilation is unavailable, re-exports the pre-embedded fallback
/// constants under the same names so `include!`-ing the generated file
/// is identical from the caller's perspective either way.
fn write_fallback_shim(dest: &Path) {
    let mut out = String::new();
    out.push_str("// Generated by build.rs (fallback path). Do not edit.\n\n");
    for name in SHADER_NAMES {
        let upper = name.to_uppercase();
        out.push_str(&format!(
            "pub const {upper}_COMP_SPV: &[u32] = crate::fallback::{upper}_COMP_SPV;\n"
        ));
    }
    fs::write(dest, out).expect("failed to write shader catalog shim");
}
