//! End-to-end dispatch demo: generate a vector-add PTX artifact, run it,
//! retrieve the result.
//!
//! Run with: cargo run -p vectra-gpu --example vector_add --features cuda

use vectra_gpu::{execute, retrieve, DispatchOptions, KernelArg};

const N: usize = 16;

/// PTX for out[i] = a[i] + b[i] over N f64 elements.
fn add_kernel_ptx() -> String {
    format!(
        r#"
.version 7.0
.target sm_50
.address_size 64

.visible .entry kernel(
    .param .u64 a,
    .param .u64 b,
    .param .u64 out
)
{{
    .reg .pred  %p1;
    .reg .f64   %fd<4>;
    .reg .b32   %r<5>;
    .reg .b64   %rd<12>;

    ld.param.u64    %rd1, [a];
    ld.param.u64    %rd2, [b];
    ld.param.u64    %rd3, [out];
    mov.u32         %r1, %ctaid.x;
    mov.u32         %r2, %ntid.x;
    mov.u32         %r3, %tid.x;
    mad.lo.s32      %r4, %r1, %r2, %r3;
    cvt.u64.u32     %rd4, %r4;
    setp.ge.u64     %p1, %rd4, {N};
    @%p1 bra        $L_done;
    cvta.to.global.u64 %rd5, %rd1;
    cvta.to.global.u64 %rd6, %rd2;
    cvta.to.global.u64 %rd7, %rd3;
    shl.b64         %rd8, %rd4, 3;
    add.s64         %rd9, %rd5, %rd8;
    add.s64         %rd10, %rd6, %rd8;
    add.s64         %rd11, %rd7, %rd8;
    ld.global.f64   %fd1, [%rd9];
    ld.global.f64   %fd2, [%rd10];
    add.f64         %fd3, %fd1, %fd2;
    st.global.f64   [%rd11], %fd3;
$L_done:
    ret;
}}
"#
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let a: Vec<f64> = (0..N).map(|i| i as f64).collect();
    let b: Vec<f64> = (0..N).map(|i| (2 * i) as f64).collect();

    let artifact = std::env::temp_dir().join(format!("vectra-vector-add-{}.ptx", std::process::id()));
    std::fs::write(&artifact, add_kernel_ptx())?;

    let args = [
        KernelArg::new(bytemuck::cast_slice(&a), N),
        KernelArg::new(bytemuck::cast_slice(&b), N),
    ];
    let handle = execute(&args, &artifact, &DispatchOptions::default())?;

    let mut out_bytes = vec![0u8; N * 8];
    retrieve(&mut out_bytes, handle)?;
    let c: &[f64] = bytemuck::cast_slice(&out_bytes);

    println!("Results:");
    for i in 0..N {
        println!("{} + {} = {}", a[i], b[i], c[i]);
    }
    Ok(())
}
