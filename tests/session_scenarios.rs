mod common;

use std::sync::atomic::Ordering;

use common::{join_over, mock_pair_observable, spawn_client_plumbing};
use wampcore::{CallOptions, Client, Msg, SerializerType, WampDict, WampError};

/// Gives the event loop a chance to run `shutdown()` after the caller side
/// has dropped/closed the session, without relying on a fixed sleep.
async fn wait_for_close(closed: &std::sync::atomic::AtomicBool) {
    for _ in 0..200 {
        if closed.load(Ordering::SeqCst) {
            return;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn close_during_pending_call_surfaces_as_error_and_closes_transport() {
    let (transport, mut router, closed) = mock_pair_observable();
    let (mut client, (event_loop, rpc_queue)) =
        Client::connect_with_transport(Box::new(transport), SerializerType::Json, None)
            .await
            .expect("mock connect never fails");
    spawn_client_plumbing(event_loop, rpc_queue);
    join_over(&mut client, &mut router).await;

    let mut call = client.call("slow.op", CallOptions::default(), None, None);
    let call_task = tokio::spawn(async move { call.result().await });

    // Let the CALL actually hit the wire, then close the session without the
    // router ever answering it.
    match router.recv_msg().await {
        Msg::Call { .. } => {}
        other => panic!("expected CALL, got {:?}", other),
    }

    client.disconnect().await;

    let err = call_task.await.expect("call task panicked").expect_err("call should fail once the session is gone");
    assert!(matches!(err, WampError::ClientClosed), "unexpected error: {:?}", err);

    wait_for_close(&closed).await;
    assert!(closed.load(Ordering::SeqCst), "transport should be closed once the session shuts down");
}

#[tokio::test]
async fn challenge_without_auth_keyring_fails_join_and_closes_transport() {
    let (transport, mut router, closed) = mock_pair_observable();
    let (mut client, (event_loop, rpc_queue)) =
        Client::connect_with_transport(Box::new(transport), SerializerType::Json, None)
            .await
            .expect("mock connect never fails");
    spawn_client_plumbing(event_loop, rpc_queue);

    // An anonymous join (no auth keyring configured) that gets challenged
    // anyway has nothing to answer with and must abort the join.
    let (join_res, _) = tokio::join!(client.join_realm("test.realm"), async {
        match router.recv_msg().await {
            Msg::Hello { .. } => {}
            other => panic!("expected HELLO, got {:?}", other),
        }
        router.send_msg(&Msg::Challenge { auth_method: "wampcra".to_owned(), extra: WampDict::new() }).await;
    });

    let err = join_res.expect_err("join should fail when challenged without a configured auth keyring");
    assert!(matches!(err, WampError::AuthError(_)), "unexpected error: {:?}", err);

    wait_for_close(&closed).await;
    assert!(closed.load(Ordering::SeqCst), "transport should be closed once the aborted join tears down the session");
}
