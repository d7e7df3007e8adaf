//! `pipeline_scenarios` 集成测试：在进程内串联多个阶段，校验链式调用语义。
//!
//! # 测试总览（Why）
//! - 每个场景都在两种桥接策略下各运行一次，确认策略对阶段代码不可见；
//! - 覆盖上下文传播、中间件改写、上游错误旁路、阶段内中止与未注册下一阶段。
//!
//! # 结构安排（How）
//! - `copy_request_to_response`：末端阶段，把请求正文与头部复制到响应；
//! - 其余阶段按场景内联定义，通过 `Rc<Cell<_>>` 把阶段内的观察结果带回测试。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use hopline_guest::{
    BridgeError, BridgeStrategy, ChainClient, ChainError, Context, InProcessPipeline,
    PipelineError, StageResult,
};
use hopline_signature::ContextError;
use tracing_test::traced_test;

const STRATEGIES: [BridgeStrategy; 2] = [BridgeStrategy::DirectArray, BridgeStrategy::SharedMemory];

fn sample() -> Context {
    let mut ctx = Context::new();
    ctx.request_mut()
        .set_method("GET")
        .set_uri("https://example.com")
        .set_protocol("HTTP/1.1")
        .set_remote_ip("1.2.3.4")
        .set_body("Hello world this is a request body")
        .set_header("content", vec!["hello".to_owned()]);
    ctx
}

fn copy_request_to_response(client: &mut ChainClient) -> StageResult {
    let request = client.request().clone();
    let response = client.response_mut();
    response
        .set_status_code(200)
        .set_body_bytes(request.body().to_vec());
    for (name, values) in request.headers() {
        response.set_header(name.clone(), values.value().to_vec());
    }
    Ok(())
}

fn middleware(client: &mut ChainClient) -> StageResult {
    client
        .request_mut()
        .set_header("MIDDLEWARE", vec!["TRUE".to_owned()]);
    client.next()?;
    Ok(())
}

#[test]
fn single_stage_copies_request_into_response() {
    for strategy in STRATEGIES {
        let output = InProcessPipeline::new()
            .with_strategy(strategy)
            .stage(copy_request_to_response)
            .run(sample())
            .expect("pipeline");

        let request = output.request();
        assert_eq!(request.method(), "GET");
        assert_eq!(request.uri(), "https://example.com");
        assert_eq!(request.content_length(), request.body().len() as i64);
        assert_eq!(output.response().status_code(), 200);
        assert_eq!(
            output.response().body(),
            b"Hello world this is a request body"
        );
        assert_eq!(
            output.response().header("content").map(|h| h.value()),
            Some(&["hello".to_owned()][..])
        );
    }
}

#[test]
fn middleware_header_reaches_terminal_stage() {
    for strategy in STRATEGIES {
        let output = InProcessPipeline::new()
            .with_strategy(strategy)
            .stage(middleware)
            .stage(copy_request_to_response)
            .run(sample())
            .expect("pipeline");

        assert_eq!(
            output.response().header("MIDDLEWARE").map(|h| h.value()),
            Some(&["TRUE".to_owned()][..]),
            "strategy {strategy}"
        );
        assert_eq!(
            output.response().header("content").map(|h| h.value()),
            Some(&["hello".to_owned()][..])
        );
    }
}

#[test]
fn next_replaces_context_wholesale() {
    for strategy in STRATEGIES {
        let observed = Rc::new(RefCell::new(None));
        let seen = Rc::clone(&observed);
        InProcessPipeline::new()
            .with_strategy(strategy)
            .stage(move |client| {
                client.request_mut().set_header("x-local", vec!["1".to_owned()]);
                let after = client.next()?;
                *seen.borrow_mut() = Some(after.clone());
                Ok(())
            })
            .stage(|client| {
                client.request_mut().headers_mut().clear();
                client.response_mut().set_status_code(204);
                Ok(())
            })
            .run(sample())
            .expect("pipeline");

        let after = observed.borrow_mut().take().expect("stage observed next");
        assert!(after.request().headers().is_empty());
        assert_eq!(after.response().status_code(), 204);
    }
}

#[test]
fn shrinking_results_leave_no_stale_bytes() {
    for strategy in STRATEGIES {
        let output = InProcessPipeline::new()
            .with_strategy(strategy)
            .stage(|client| {
                client.request_mut().set_body("x".repeat(4096));
                client.next()?;
                assert_eq!(client.response().body().len(), 4096);

                client.request_mut().set_body("tiny");
                client.response_mut().headers_mut().clear();
                client.next()?;
                Ok(())
            })
            .stage(copy_request_to_response)
            .run(sample())
            .expect("pipeline");

        assert_eq!(output.request().body(), b"tiny");
        assert_eq!(output.request().content_length(), 4);
        assert_eq!(output.response().body(), b"tiny");
    }
}

#[test]
fn downstream_error_bypasses_upstream_context() {
    for strategy in STRATEGIES {
        let unchanged = Rc::new(Cell::new(false));
        let flag = Rc::clone(&unchanged);
        let err = InProcessPipeline::new()
            .with_strategy(strategy)
            .stage(move |client| {
                client.request_mut().set_uri("/before-next");
                let before = client.context().clone();
                let err = client.next().expect_err("downstream aborts");
                assert_eq!(err, ChainError::Upstream("next error".to_owned()));
                flag.set(client.context() == &before);
                Err(err.into())
            })
            .stage(|_| Err("next error".into()))
            .run(sample())
            .expect_err("pipeline aborts");

        assert_eq!(
            err,
            PipelineError::Context(ContextError::Upstream("next error".to_owned()))
        );
        assert!(unchanged.get(), "context must survive an upstream error");
    }
}

#[test]
fn error_passes_through_every_upstream_stage_verbatim() {
    let err = InProcessPipeline::new()
        .stage(middleware)
        .stage(middleware)
        .stage(|_| Err("deep failure".into()))
        .run(sample())
        .expect_err("pipeline aborts");
    assert_eq!(
        err,
        PipelineError::Context(ContextError::Upstream("deep failure".to_owned()))
    );
}

#[test]
#[traced_test]
fn next_without_downstream_fails_fast() {
    for strategy in STRATEGIES {
        let err = InProcessPipeline::new()
            .with_strategy(strategy)
            .stage(|client| {
                let err = client.next().expect_err("no downstream");
                assert_eq!(err, ChainError::Bridge(BridgeError::Unwired));
                Err(err.into())
            })
            .run(sample())
            .expect_err("pipeline aborts");
        assert_eq!(
            err,
            PipelineError::Context(ContextError::Upstream(BridgeError::Unwired.to_string()))
        );
    }
    assert!(logs_contain("next stage invoked but none is registered"));
}

#[test]
fn abort_inside_stage_stops_the_pipeline() {
    for strategy in STRATEGIES {
        let reached = Rc::new(Cell::new(false));
        let terminal = Rc::clone(&reached);
        let observed = Rc::new(RefCell::new(None));
        let seen = Rc::clone(&observed);
        let err = InProcessPipeline::new()
            .with_strategy(strategy)
            .stage(move |client| {
                let err = client.next().expect_err("downstream aborts");
                *seen.borrow_mut() = Some(err.clone());
                Err(err.into())
            })
            .stage(|client| {
                client.request_mut().set_uri("/must-not-leak");
                client.abort("stage refused")?;
                Ok(())
            })
            .stage(move |_| {
                terminal.set(true);
                Ok(())
            })
            .run(sample())
            .expect_err("pipeline aborts");

        assert_eq!(
            err,
            PipelineError::Context(ContextError::Upstream("stage refused".to_owned())),
            "strategy {strategy}"
        );
        assert_eq!(err.code(), "context.upstream");
        assert_eq!(
            observed.borrow_mut().take(),
            Some(ChainError::Upstream("stage refused".to_owned()))
        );
        assert!(!reached.get(), "aborting stage never called next");
    }
}
