//! End-to-end middleware behaviour through `create_core`.

use scaleflow_core::{
    apply_middleware, apply_plugin, compose, create_core, middleware, plugin, staged_middleware,
    step, CoreError, Deferred, DispatchFn, Options, INIT,
};
use scaleflow_testing::Recorder;
use serde_json::json;

// ============================================================================
// Dispatch order
// ============================================================================

#[tokio::test]
async fn test_middleware_redirect_passes_outer_links_twice() {
    let recorder = Recorder::new();
    let redirect = {
        let recorder = recorder.clone();
        middleware(move |api, next, action| {
            recorder.record(format!("m2:{}", action["type"].as_str().unwrap_or_default()));
            if action["type"] == "first" {
                api.dispatch(json!({ "type": "second" }))
            } else {
                next(action)
            }
        })
    };

    let core = create_core(
        Options::new(),
        Some(apply_middleware([
            recorder.middleware("m1"),
            redirect,
            recorder.middleware("m3"),
        ])),
    )
    .await
    .unwrap();
    core.subscribe(recorder.listener("sub"));

    let result = core.dispatch(json!({ "type": "first" })).await.unwrap();

    assert_eq!(result["type"], "second");
    assert_eq!(recorder.count("m1"), 3);
    assert_eq!(recorder.count("m2"), 3);
    assert_eq!(recorder.count("m3"), 2);
    assert_eq!(recorder.count("sub"), 1);
    assert_eq!(
        recorder.entries_after_init(),
        vec!["m1:first", "m2:first", "m1:second", "m2:second", "m3:second", "sub:second"]
    );
}

#[tokio::test]
async fn test_plugin_then_middleware_pipeline() {
    let recorder = Recorder::new();
    let attach_x = plugin(|core| Deferred::ready(core.with_capability("x", 1_i64)));

    let core = create_core(
        Options::new(),
        Some(compose![
            apply_plugin([attach_x]),
            apply_middleware([recorder.middleware("log")]),
        ]),
    )
    .await
    .unwrap();
    core.subscribe(recorder.listener("sub"));
    recorder.clear();

    core.dispatch(json!({ "type": "foo" })).await.unwrap();

    assert_eq!(recorder.entries(), vec!["log:foo", "sub:foo"]);
    assert_eq!(core.capability::<i64>("x").as_deref(), Some(&1));
}

#[tokio::test]
async fn test_separately_installed_middleware_nest_in_order() {
    let single = Recorder::new();
    let one_call = create_core(
        Options::new(),
        Some(apply_middleware([single.middleware("a"), single.middleware("b")])),
    )
    .await
    .unwrap();

    let nested = Recorder::new();
    let two_calls = create_core(
        Options::new(),
        Some(compose![
            apply_middleware([nested.middleware("a")]),
            apply_middleware([nested.middleware("b")]),
        ]),
    )
    .await
    .unwrap();

    one_call.dispatch(json!({ "type": "x" })).await.unwrap();
    two_calls.dispatch(json!({ "type": "x" })).await.unwrap();

    assert_eq!(single.entries(), nested.entries());
    assert_eq!(
        nested.entries(),
        vec![
            format!("a:{INIT}"),
            format!("b:{INIT}"),
            "a:x".to_string(),
            "b:x".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_install_stage_runs_once_when_chain_is_rebuilt() {
    let recorder = Recorder::new();
    let audit = {
        let recorder = recorder.clone();
        staged_middleware(move |api| {
            recorder.record("install");
            api.subscribe(recorder.listener("audit"));
            step(|next: DispatchFn| Deferred::ready(next))
        })
    };

    let core = create_core(
        Options::new(),
        Some(compose![
            apply_middleware([audit]),
            apply_middleware([recorder.middleware("inner")]),
        ]),
    )
    .await
    .unwrap();
    core.dispatch(json!({ "type": "x" })).await.unwrap();

    assert_eq!(
        recorder.entries_after_init(),
        vec!["install", "inner:x", "audit:x"]
    );
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_action_without_type_is_rejected_at_the_base() {
    let recorder = Recorder::new();
    let core = create_core(Options::new(), Some(apply_middleware([recorder.middleware("m")])))
        .await
        .unwrap();
    core.subscribe(recorder.listener("sub"));

    let err = core.dispatch(json!({ "payload": 1 })).await.unwrap_err();

    assert!(matches!(err, CoreError::InvalidActionKind { .. }));
    assert_eq!(recorder.count("m"), 2);
    assert_eq!(recorder.count("sub"), 0);
}

#[tokio::test]
async fn test_async_middleware_failure_reaches_the_caller() {
    let failing = middleware(|_api, _next, action| {
        Deferred::pending(async move {
            tokio::task::yield_now().await;
            if action["type"] == "boom" {
                Err(anyhow::anyhow!("boom").into())
            } else {
                Ok(action)
            }
        })
    });
    let core = create_core(Options::new(), Some(apply_middleware([failing])))
        .await
        .unwrap();

    let err = core.dispatch(json!({ "type": "boom" })).await.unwrap_err();
    assert_eq!(err.to_string(), "boom");
    assert!(core.dispatch(json!({ "type": "fine" })).await.is_ok());
}

#[tokio::test]
async fn test_dispatcher_outlives_the_core_handle() {
    let recorder = Recorder::new();
    let core = create_core(Options::new(), Some(apply_middleware([recorder.middleware("m")])))
        .await
        .unwrap();
    let dispatch = core.dispatcher();
    drop(core);

    dispatch(json!({ "type": "late" })).await.unwrap();
    assert_eq!(recorder.entries_after_init(), vec!["m:late"]);
}
