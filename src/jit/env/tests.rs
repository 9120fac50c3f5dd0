//! Tests for the environment bridge.
//!
//! These build IR against a module for the host target and verify it; the
//! end-to-end behaviour is covered by the integration tests.

use super::*;
use cranelift::codegen::ir::UserFuncName;
use cranelift::codegen::verify_function;
use cranelift_jit::{JITBuilder, JITModule};

use crate::jit::codegen::CodegenContext;
use crate::jit::env::ops::CallOperands;
use crate::jit::frame::{FrameRuntime, LinearMemory};
use crate::jit::types::{CallKind, EnvKey};

fn host_module() -> JITModule {
    let isa = cranelift_native::builder()
        .expect("host ISA")
        .finish(settings::Flags::new(settings::builder()))
        .expect("ISA flags");
    JITModule::new(JITBuilder::with_isa(
        isa,
        cranelift_module::default_libcall_names(),
    ))
}

/// Build one function, run `f` against a fresh bridge and verify the IR.
fn with_bridge(
    dispatch: EnvDispatch,
    f: impl FnOnce(&mut EnvBridge<'_, JITModule>, &mut CodegenContext<'_, '_>),
) -> (usize, EnvFuncTable) {
    let mut module = host_module();
    let conv = CallConvDescriptor::for_isa(module.isa()).expect("supported host");
    let frontend = module.isa().frontend_config();
    let mut table = EnvFuncTable::new(conv);

    let mut sig = module.make_signature();
    sig.params.push(AbiParam::new(conv.pointer_type));
    let mut func = Function::with_name_signature(UserFuncName::default(), sig);
    let mut func_ctx = FunctionBuilderContext::new();

    let capacity = {
        let mut builder = FunctionBuilder::new(&mut func, &mut func_ctx);
        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        builder.seal_block(entry);
        let rt = builder.block_params(entry)[0];

        let mut codegen = CodegenContext::new(&mut builder, rt, conv.pointer_type, conv.endianness);
        let mut bridge = EnvBridge::new(
            &mut module,
            &mut table,
            &FrameRuntime,
            &LinearMemory,
            dispatch,
            frontend,
        );
        f(&mut bridge, &mut codegen);
        assert_eq!(bridge.slots().cursor(), 0);
        let capacity = bridge.slots().capacity();

        codegen.builder.ins().return_(&[]);
        builder.finalize();
        capacity
    };

    verify_function(&func, module.isa()).expect("valid IR");
    (capacity, table)
}

fn slots_for(
    dispatch: EnvDispatch,
    f: impl FnOnce(&mut EnvBridge<'_, JITModule>, &mut CodegenContext<'_, '_>),
) -> usize {
    with_bridge(dispatch, f).0
}

#[test]
fn test_slot_demand_per_operation() {
    let generic = EnvDispatch::Generic;

    assert_eq!(
        slots_for(generic, |b, cg| {
            let k = cg.const_u64(1);
            b.sload(cg, k).unwrap();
        }),
        2
    );
    assert_eq!(
        slots_for(generic, |b, cg| {
            let k = cg.const_u64(1);
            let v = cg.const_u64(2);
            b.sstore(cg, k, v).unwrap();
        }),
        2
    );
    assert_eq!(
        slots_for(generic, |b, cg| {
            let a = cg.const_u64(0xbeef);
            b.selfdestruct(cg, a).unwrap();
        }),
        2
    );
    assert_eq!(
        slots_for(generic, |b, cg| {
            let i = cg.const_u64(0);
            b.calldataload(cg, i).unwrap();
        }),
        1
    );
    assert_eq!(
        slots_for(generic, |b, cg| {
            let v = cg.const_u64(0);
            let o = cg.const_u64(0);
            let s = cg.const_u64(4);
            b.create(cg, v, o, s).unwrap();
        }),
        2
    );
    assert_eq!(
        slots_for(generic, |b, cg| {
            let o = cg.const_u64(0);
            let s = cg.const_u64(4);
            b.sha3(cg, o, s).unwrap();
        }),
        1
    );
    assert_eq!(
        slots_for(generic, |b, cg| {
            let a = cg.const_u64(7);
            b.extcode(cg, a).unwrap();
        }),
        2
    );
    assert_eq!(
        slots_for(generic, |b, cg| {
            let o = cg.const_u64(0);
            let s = cg.const_u64(10);
            let t = cg.const_u64(1);
            b.log(cg, o, s, &[t, t]).unwrap();
            assert!(b.has_topics_buffer());
        }),
        2
    );
    assert_eq!(
        slots_for(generic, |b, cg| {
            let w = cg.const_u64(0);
            b.call(
                cg,
                CallOperands {
                    kind: CallKind::DelegateCall,
                    gas: w,
                    address: w,
                    value: None,
                    input_offset: w,
                    input_size: w,
                    output_offset: w,
                    output_size: w,
                },
            )
            .unwrap();
        }),
        3
    );
}

#[test]
fn test_pool_is_sized_by_the_widest_call_site() {
    let capacity = slots_for(EnvDispatch::Generic, |b, cg| {
        let w = cg.const_u64(3);
        b.sha3(cg, w, w).unwrap();
        assert_eq!(b.slots().capacity(), 1);
        b.sstore(cg, w, w).unwrap();
        assert_eq!(b.slots().capacity(), 2);
        for key in [EnvKey::Caller, EnvKey::Number, EnvKey::Coinbase] {
            b.query(cg, key, None).unwrap();
        }
        b.sha3(cg, w, w).unwrap();
        assert_eq!(b.slots().capacity(), 2);
    });
    assert_eq!(capacity, 2);
}

#[test]
fn test_dedicated_dispatch_uses_pointer_symbols() {
    let (capacity, table) = with_bridge(EnvDispatch::Dedicated, |b, cg| {
        let w = cg.const_u64(9);
        b.sload(cg, w).unwrap();
        b.sstore(cg, w, w).unwrap();
        b.balance(cg, w).unwrap();
        b.blockhash(cg, w).unwrap();
    });
    assert_eq!(capacity, 2);
    // env_sload, env_sstore, env_balance, env_blockhash; no generic entry points
    assert_eq!(table.declared_count(), 4);
}

#[test]
fn test_declarations_are_shared_across_call_sites() {
    let (_, table) = with_bridge(EnvDispatch::Generic, |b, cg| {
        let w = cg.const_u64(1);
        for _ in 0..3 {
            b.sload(cg, w).unwrap();
            b.balance(cg, w).unwrap();
        }
    });
    assert_eq!(table.declared_count(), 1);
}

#[test]
fn test_resolve_twice_yields_identical_declaration() {
    let mut module = host_module();
    let conv = CallConvDescriptor::for_isa(module.isa()).unwrap();
    let mut table = EnvFuncTable::new(conv);

    let first = table.resolve(&mut module, EnvFunc::Call).unwrap().id;
    let declared = module.declarations().get_functions().count();
    let second = table.resolve(&mut module, EnvFunc::Call).unwrap().id;

    assert_eq!(first, second);
    assert_eq!(module.declarations().get_functions().count(), declared);
    assert_eq!(table.declared_count(), 1);
}

#[test]
fn test_mismatched_argument_is_rejected() {
    with_bridge(EnvDispatch::Generic, |b, cg| {
        let w = cg.const_u64(1);
        let env = cg.rt_ptr();
        let err = b
            .call_with_convention(
                cg,
                EnvFunc::SLoad,
                &[EnvArg::Ptr(env), EnvArg::Word(w), EnvArg::Undef],
                false,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            crate::jit::types::JitError::AbiMismatch { param: 1, .. }
        ));
    });
}
