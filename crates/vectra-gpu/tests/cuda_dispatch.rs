//! GPU integration tests for the Vectra dispatch core.
//! Run with: cargo test -p vectra-gpu --features cuda -- --test-threads=1 --nocapture
//!
//! Round-trip tests need CUDA hardware; the artifact and device-ordinal
//! failure tests only need the feature compiled in.

#![cfg(feature = "cuda")]

use std::path::{Path, PathBuf};

use vectra_gpu::{
    execute, memory, retrieve, DispatchOptions, GpuError, KernelArg, ResultHandle,
};

/// PTX for a byte-copy kernel guarded at `n` elements: out[i] = in[i].
///
/// The code generator bakes the logical length into each artifact the
/// same way, so every size gets its own single-use module.
fn copy_kernel_ptx(n: usize) -> String {
    format!(
        r#"
.version 7.0
.target sm_50
.address_size 64

.visible .entry kernel(
    .param .u64 src,
    .param .u64 dst
)
{{
    .reg .pred  %p1;
    .reg .b16   %rs1;
    .reg .b32   %r<5>;
    .reg .b64   %rd<8>;

    ld.param.u64    %rd1, [src];
    ld.param.u64    %rd2, [dst];
    mov.u32         %r1, %ctaid.x;
    mov.u32         %r2, %ntid.x;
    mov.u32         %r3, %tid.x;
    mad.lo.s32      %r4, %r1, %r2, %r3;
    cvt.u64.u32     %rd3, %r4;
    setp.ge.u64     %p1, %rd3, {n};
    @%p1 bra        $L_done;
    cvta.to.global.u64 %rd4, %rd1;
    cvta.to.global.u64 %rd5, %rd2;
    add.s64         %rd6, %rd4, %rd3;
    add.s64         %rd7, %rd5, %rd3;
    ld.global.u8    %rs1, [%rd6];
    st.global.u8    [%rd7], %rs1;
$L_done:
    ret;
}}
"#
    )
}

/// Write a single-use artifact under the system temp dir.
fn write_artifact(tag: &str, ptx: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("vectra-test-{}-{}.ptx", std::process::id(), tag));
    std::fs::write(&path, ptx).expect("write artifact");
    path
}

fn gpu_available() -> bool {
    vectra_gpu::context::is_available()
}

#[test]
fn test_copy_roundtrip_sizes() {
    if !gpu_available() {
        eprintln!("skipping: no CUDA device");
        return;
    }
    for n in [1usize, 512, 513, 4096] {
        let input: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();
        let artifact = write_artifact(&format!("copy{}", n), &copy_kernel_ptx(n));

        let args = [KernelArg::new(&input, n)];
        let handle = execute(&args, &artifact, &DispatchOptions::default())
            .unwrap_or_else(|e| panic!("execute({}) failed: {}", n, e));

        // Single-use convention: the artifact is gone after a dispatch.
        assert!(
            std::fs::metadata(&artifact).is_err(),
            "artifact survived dispatch of n={}",
            n
        );

        let mut output = vec![0u8; n];
        retrieve(&mut output, handle).unwrap_or_else(|e| panic!("retrieve({}) failed: {}", n, e));
        assert_eq!(output, input, "byte mismatch at n={}", n);
    }
}

#[test]
fn test_handle_lifecycle_drains() {
    if !gpu_available() {
        eprintln!("skipping: no CUDA device");
        return;
    }
    let before = memory::outstanding();

    let n = 512usize;
    let input: Vec<u8> = vec![7u8; n];
    let mut handles = Vec::new();
    for i in 0..3 {
        let artifact = write_artifact(&format!("lifecycle{}", i), &copy_kernel_ptx(n));
        let args = [KernelArg::new(&input, n)];
        handles.push(execute(&args, &artifact, &DispatchOptions::default()).unwrap());
    }
    assert_eq!(memory::outstanding(), before + 3);

    let mut output = vec![0u8; n];
    for handle in handles {
        retrieve(&mut output, handle).unwrap();
    }
    assert_eq!(memory::outstanding(), before);
}

#[test]
fn test_double_retrieve_is_rejected() {
    if !gpu_available() {
        eprintln!("skipping: no CUDA device");
        return;
    }
    let n = 512usize;
    let input: Vec<u8> = vec![3u8; n];
    let artifact = write_artifact("double", &copy_kernel_ptx(n));
    let args = [KernelArg::new(&input, n)];

    let handle = execute(&args, &artifact, &DispatchOptions::default()).unwrap();
    let id = handle.id();

    let mut output = vec![0u8; n];
    retrieve(&mut output, handle).unwrap();

    let err = retrieve(&mut output, ResultHandle::from_raw(id)).unwrap_err();
    assert!(matches!(err, GpuError::UnknownHandle(got) if got == id));
}

#[test]
fn test_oversized_retrieve_keeps_buffer_parked() {
    if !gpu_available() {
        eprintln!("skipping: no CUDA device");
        return;
    }
    let n = 512usize;
    let input: Vec<u8> = (0..n).map(|i| i as u8).collect();
    let artifact = write_artifact("bounds", &copy_kernel_ptx(n));
    let args = [KernelArg::new(&input, n)];

    let handle = execute(&args, &artifact, &DispatchOptions::default()).unwrap();
    let id = handle.id();

    let mut too_big = vec![0u8; n + 1];
    let err = retrieve(&mut too_big, handle).unwrap_err();
    assert!(matches!(err, GpuError::RetrieveOutOfBounds { .. }));

    // The failed call must not have released the buffer.
    let mut output = vec![0u8; n];
    retrieve(&mut output, ResultHandle::from_raw(id)).unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_missing_artifact_before_device_work() {
    let input = [1u8; 16];
    let args = [KernelArg::new(&input, 16)];
    let err = execute(
        &args,
        Path::new("/nonexistent/vectra/kernel.ptx"),
        &DispatchOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GpuError::ArtifactNotFound { .. }));
}

#[test]
fn test_invalid_device_ordinal_before_module_load() {
    let input = [1u8; 16];
    let artifact = write_artifact("badordinal", &copy_kernel_ptx(16));
    let args = [KernelArg::new(&input, 16)];

    let opts = DispatchOptions {
        device: 9999,
        ..Default::default()
    };
    let err = execute(&args, &artifact, &opts).unwrap_err();
    assert!(matches!(err, GpuError::DeviceInit(_)));

    // No module load happened, so the single-use delete didn't either.
    assert!(std::fs::metadata(&artifact).is_ok());
    std::fs::remove_file(&artifact).unwrap();
}

#[test]
fn test_entry_point_override() {
    if !gpu_available() {
        eprintln!("skipping: no CUDA device");
        return;
    }
    let n = 64usize;
    let input: Vec<u8> = vec![9u8; n];
    // Same module text, different exported name.
    let ptx = copy_kernel_ptx(n).replace(".entry kernel", ".entry copy_bytes");
    let artifact = write_artifact("entry", &ptx);
    let args = [KernelArg::new(&input, n)];

    let opts = DispatchOptions {
        entry_point: "copy_bytes".to_string(),
        ..Default::default()
    };
    let handle = execute(&args, &artifact, &opts).unwrap();
    let mut output = vec![0u8; n];
    retrieve(&mut output, handle).unwrap();
    assert_eq!(output, input);
}
