//! Behaviour of the per-test application bootstrap.

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use marathon::Config;
use marathon_testing::{
    AppFixture,
    FixtureError,
    Method,
    StatusCode,
    TestAgent,
    TestResult,
    app_fixture,
    assert_status,
    assert_text,
    test_config,
};
use rstest::rstest;
use serial_test::serial;
use tokio::net::TcpStream;

fn localhost(port: u16) -> SocketAddr { SocketAddr::new(Ipv4Addr::LOCALHOST.into(), port) }

async fn accepts(addr: SocketAddr) -> bool { TcpStream::connect(addr).await.is_ok() }

#[rstest]
#[tokio::test]
#[serial]
async fn ports_increase_with_each_case(mut app_fixture: AppFixture) -> TestResult {
    let first = app_fixture.setup().await?;
    assert_eq!(first.port, 9001);
    assert_eq!(app_fixture.config().port(), 9001);

    let second = app_fixture.setup().await?;
    assert_eq!(second.port, 9002);
    assert_eq!(app_fixture.config().port(), 9002);
    assert_eq!(app_fixture.last_port(), 9002);

    first.finish().await;
    second.finish().await;
    app_fixture.teardown().await;
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn app_is_built_once_per_fixture(mut app_fixture: AppFixture) -> TestResult {
    assert!(app_fixture.app().is_none());

    let first = app_fixture.setup().await?;
    let second = app_fixture.setup().await?;

    assert!(Arc::ptr_eq(&first.app, &second.app));
    assert_eq!(app_fixture.constructions(), 1);
    assert!(
        app_fixture
            .app()
            .is_some_and(|app| Arc::ptr_eq(app, &first.app))
    );
    assert!(first.app.config().ptr_eq(app_fixture.config()));

    first.finish().await;
    second.finish().await;
    app_fixture.teardown().await;
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn each_case_gets_a_fresh_agent(mut app_fixture: AppFixture) -> TestResult {
    let first = app_fixture.setup().await?;
    let second = app_fixture.setup().await?;

    assert_ne!(first.request.addr(), second.request.addr());
    assert!(!first.request.server().same_listener(second.request.server()));

    let response = second.request.get("/healthcheck").send().await?;
    assert_status(&response, StatusCode::OK);

    first.finish().await;
    second.finish().await;
    app_fixture.teardown().await;
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn run_serves_on_allocated_port(mut app_fixture: AppFixture) -> TestResult {
    let ctx = app_fixture.setup().await?;
    assert_eq!(ctx.server.local_addr().port(), ctx.port);
    assert_ne!(ctx.request.addr().port(), ctx.port);

    let response = reqwest::Client::builder()
        .no_proxy()
        .build()?
        .get(format!("http://{}/healthcheck", localhost(ctx.port)))
        .send()
        .await?;
    assert_text(response, "WORKING").await;

    ctx.finish().await;
    app_fixture.teardown().await;
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn startup_failure_fails_the_case(test_config: Config) -> TestResult {
    let mut fixture = AppFixture::with_base_port(test_config, 9100);
    let occupant = StdTcpListener::bind(localhost(9101))?;

    let err = fixture.setup().await.expect_err("setup should fail");
    assert!(
        matches!(err, FixtureError::Startup(_)),
        "unexpected error: {err:?}"
    );
    assert_eq!(fixture.constructions(), 1);

    drop(occupant);
    let ctx = fixture.setup().await?;
    assert_eq!(ctx.port, 9102, "a failed case still consumes its port");
    assert_eq!(fixture.constructions(), 1);

    ctx.finish().await;
    fixture.teardown().await;
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn teardown_releases_every_listener(mut app_fixture: AppFixture) -> TestResult {
    let first = app_fixture.setup().await?;
    let second = app_fixture.setup().await?;
    let addrs = [
        first.request.addr(),
        first.server.local_addr(),
        second.request.addr(),
        second.server.local_addr(),
    ];
    assert_eq!(app_fixture.open_listeners(), 4);
    for addr in addrs {
        assert!(accepts(addr).await, "{addr} should accept before teardown");
    }

    drop(first);
    drop(second);
    app_fixture.teardown().await;

    assert_eq!(app_fixture.open_listeners(), 0);
    for addr in addrs {
        assert!(!accepts(addr).await, "{addr} still accepting after teardown");
    }
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn finish_releases_the_case_listeners(mut app_fixture: AppFixture) -> TestResult {
    let ctx = app_fixture.setup().await?;
    let agent_addr = ctx.request.addr();
    let run_addr = ctx.server.local_addr();

    ctx.finish().await;

    assert!(!accepts(agent_addr).await);
    assert!(!accepts(run_addr).await);
    assert_eq!(app_fixture.open_listeners(), 0);
    app_fixture.teardown().await;
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn dropping_the_fixture_signals_shutdown(mut app_fixture: AppFixture) -> TestResult {
    let ctx = app_fixture.setup().await?;
    let server = ctx.server.clone();
    drop(ctx);

    assert!(!server.is_closed());
    drop(app_fixture);
    assert!(server.is_closed());
    server.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn finished_cases_are_forgotten(mut app_fixture: AppFixture) -> TestResult {
    let first = app_fixture.setup().await?;
    assert_eq!(app_fixture.tracked_listeners(), 2);
    first.finish().await;
    assert_eq!(app_fixture.tracked_listeners(), 2);

    let second = app_fixture.setup().await?;
    assert_eq!(app_fixture.tracked_listeners(), 2, "closed listeners are dropped");
    assert_eq!(app_fixture.open_listeners(), 2);

    second.finish().await;
    app_fixture.teardown().await;
    assert_eq!(app_fixture.tracked_listeners(), 0);
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn agent_sends_every_method(mut app_fixture: AppFixture) -> TestResult {
    let ctx = app_fixture.setup().await?;

    let response = ctx.request.request(Method::GET, "/healthcheck").send().await?;
    assert_status(&response, StatusCode::OK);
    let response = ctx.request.put("/healthcheck").send().await?;
    assert_status(&response, StatusCode::METHOD_NOT_ALLOWED);
    let response = ctx.request.delete("/healthcheck").send().await?;
    assert_status(&response, StatusCode::METHOD_NOT_ALLOWED);

    ctx.finish().await;
    app_fixture.teardown().await;
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn agent_attaches_to_a_running_listener(mut app_fixture: AppFixture) -> TestResult {
    let ctx = app_fixture.setup().await?;

    let agent = TestAgent::attach(ctx.server.clone())?;
    assert_eq!(agent.addr(), localhost(ctx.port));
    assert_eq!(agent.url("/healthcheck"), format!("http://127.0.0.1:{}/healthcheck", ctx.port));
    let response = agent.get("/healthcheck").send().await?;
    assert_text(response, "WORKING").await;

    agent.close().await;
    assert!(ctx.server.is_closed(), "closing the agent stops its listener");

    ctx.finish().await;
    app_fixture.teardown().await;
    Ok(())
}
