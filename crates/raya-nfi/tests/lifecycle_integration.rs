//! Integration tests for the nfi-native context lifecycle

use raya_nfi::{
    CallTarget, ContextLifecycle, Env, Fault, GuestLanguage, NativeSimpleType, NfiBackendFactory,
    NfiBackendTools, NfiError, NfiLanguage, ParsingRequest, NATIVE_BACKEND_ID,
};
use std::sync::Arc;

#[derive(Debug)]
struct LibffiTools;

impl NfiBackendTools for LibffiTools {}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[test]
fn test_full_lifecycle() {
    init_tracing();
    let language = NfiLanguage::new();
    let ctx = language.create_context(Env::new()).unwrap();
    assert_eq!(ctx.lifecycle(), ContextLifecycle::Uninitialized);

    language.initialize_context(&ctx).unwrap();
    assert_eq!(ctx.lifecycle(), ContextLifecycle::Initialized);

    language.dispose_context(&ctx).unwrap();
    assert_eq!(ctx.lifecycle(), ContextLifecycle::Disposed);
}

#[test]
fn test_initialization_failure_propagates() {
    init_tracing();
    let language = NfiLanguage::new();
    let env = Env::builder()
        .option("nfi.isolated_namespace", "sometimes")
        .build();
    let ctx = language.create_context(env).unwrap();

    let err = language.initialize_context(&ctx).unwrap_err();
    assert!(matches!(err, NfiError::InitializationFailure(_)));
    assert!(!err.is_programming_fault());
    assert_eq!(ctx.lifecycle(), ContextLifecycle::Uninitialized);
    assert_eq!(ctx.initialization_count(), 1);
}

#[test]
fn test_every_operation_on_disposed_context_faults() {
    let language = NfiLanguage::new();
    let ctx = language.create_context(Env::new()).unwrap();
    language.initialize_context(&ctx).unwrap();
    language.dispose_context(&ctx).unwrap();

    let fault = NfiError::ProgrammingFault(Fault::Disposed(ctx.id()));
    assert_eq!(language.initialize_context(&ctx), Err(fault.clone()));
    assert_eq!(language.patch_context(&ctx, Env::new()), Err(fault.clone()));
    assert_eq!(language.dispose_context(&ctx), Err(fault.clone()));
    assert_eq!(ctx.lookup_simple_type(NativeSimpleType::Sint32), Err(fault.clone()));
    assert_eq!(ctx.lookup_array_type(NativeSimpleType::Sint32), Err(fault.clone()));
    assert_eq!(ctx.env_type(), Err(fault.clone()));
    assert!(ctx.backend().unwrap_err().is_programming_fault());
}

#[test]
fn test_patch_preserves_type_identities() {
    init_tracing();
    let language = NfiLanguage::new();
    let pre_env = Env::builder().preinitialization(true).build();
    let ctx = language.create_context(pre_env).unwrap();
    language.initialize_context(&ctx).unwrap();

    let simple = ctx.lookup_simple_type(NativeSimpleType::Double).unwrap();
    let array = ctx.lookup_array_type(NativeSimpleType::Uint8).unwrap();
    let env_type = ctx.env_type().unwrap();
    assert_eq!(ctx.initialization_count(), 1);

    let live_env = Env::builder()
        .option("nfi.default_library", "libc.so.6")
        .build();
    language.patch_context(&ctx, live_env.clone()).unwrap();

    assert_eq!(ctx.initialization_count(), 2);
    assert_eq!(ctx.patch_count(), 1);
    assert!(ctx.env().same_env(&live_env));
    assert!(Arc::ptr_eq(
        &simple,
        &ctx.lookup_simple_type(NativeSimpleType::Double).unwrap()
    ));
    assert!(Arc::ptr_eq(
        &array,
        &ctx.lookup_array_type(NativeSimpleType::Uint8).unwrap()
    ));
    assert!(Arc::ptr_eq(&env_type, &ctx.env_type().unwrap()));
}

#[test]
fn test_patch_keeps_backend() {
    let language = NfiLanguage::new();
    let pre_env = Env::builder().preinitialization(true).build();
    let ctx = language.create_context(pre_env.clone()).unwrap();
    language.initialize_context(&ctx).unwrap();

    let factory = pre_env.lookup_backend_factory(NATIVE_BACKEND_ID).unwrap();
    let backend = factory.create_backend(Arc::new(LibffiTools));

    language.patch_context(&ctx, Env::new()).unwrap();
    let after = ctx.backend().unwrap().unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&backend), Arc::as_ptr(&after)));
}

#[test]
fn test_failed_patch_allows_fresh_context() {
    let language = NfiLanguage::new();
    let ctx = language
        .create_context(Env::builder().preinitialization(true).build())
        .unwrap();
    language.initialize_context(&ctx).unwrap();

    let bad_env = Env::builder().option("nfi.default_library", "").build();
    let err = language.patch_context(&ctx, bad_env).unwrap_err();
    assert!(matches!(err, NfiError::PatchFailure(_)));

    language.dispose_context(&ctx).unwrap();
    let fresh = language.create_context(Env::new()).unwrap();
    language.initialize_context(&fresh).unwrap();
    assert_eq!(fresh.lifecycle(), ContextLifecycle::Initialized);
}

#[test]
fn test_factory_registered_on_every_env() {
    let language = NfiLanguage::new();
    let env_a = Env::new();
    let env_b = Env::new();
    language.create_context(env_a.clone()).unwrap();
    language.create_context(env_b.clone()).unwrap();

    let a = env_a.lookup_backend_factory(NATIVE_BACKEND_ID).unwrap();
    let b = env_b.lookup_backend_factory(NATIVE_BACKEND_ID).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.backend_id(), "native");
}

#[test]
fn test_conflicting_factory_registration_faults() {
    struct ForeignFactory;

    impl NfiBackendFactory for ForeignFactory {
        fn backend_id(&self) -> &str {
            NATIVE_BACKEND_ID
        }

        fn create_backend(
            &self,
            _tools: Arc<dyn NfiBackendTools>,
        ) -> Arc<dyn raya_nfi::NfiBackend> {
            unreachable!("never asked for a backend")
        }
    }

    let env = Env::new();
    env.register_backend_factory(Arc::new(ForeignFactory)).unwrap();

    let language = NfiLanguage::new();
    let err = language.create_context(env.clone()).unwrap_err();
    assert_eq!(
        err,
        NfiError::ProgrammingFault(Fault::ConflictingRegistration {
            backend_id: NATIVE_BACKEND_ID.to_string(),
            env: env.id().as_u64(),
        })
    );
    assert_eq!(language.engine().contexts_created(), 0);
}

#[test]
fn test_reusing_env_for_second_context() {
    let language = NfiLanguage::new();
    let env = Env::new();
    language.create_context(env.clone()).unwrap();
    language.create_context(env.clone()).unwrap();
    assert_eq!(env.backend_factory_count(), 1);
    assert_eq!(language.engine().contexts_created(), 2);
}

#[test]
fn test_direct_execution_is_rejected_without_side_effects() {
    let language = NfiLanguage::new();
    let ctx = language.create_context(Env::new()).unwrap();
    language.initialize_context(&ctx).unwrap();
    let populated = language.engine().types().populated();

    let target = language
        .parse(&ParsingRequest::new("application/x-raya-nfi", "load libc.so.6"))
        .unwrap();
    for _ in 0..3 {
        let err = target.call(&["1".to_string()]).unwrap_err();
        assert!(matches!(err, NfiError::Unsupported(_)));
        assert_eq!(err.to_string(), "Unsupported operation: illegal access to internal language");
    }

    assert_eq!(language.engine().types().populated(), populated);
    assert!(language.engine().backend().is_none());
    assert_eq!(language.engine().contexts_created(), 1);
    assert!(language.single_context_assumption().is_valid());
}
