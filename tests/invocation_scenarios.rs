mod common;

use common::joined_client;
use wampcore::{ClientConfig, Invocation, InvocationResult, Msg, RegisterOptions, WampDict};

#[tokio::test]
async fn handler_sending_progress_yields_progress_then_final() {
    let (client, mut router) = joined_client(ClientConfig::default()).await;

    let register = client.register("io.giesela.letters", RegisterOptions::default(), |inv: Invocation| async move {
        inv.send_progress(InvocationResult::args(vec!["a".into()])).expect("caller asked for progress");
        inv.send_progress(InvocationResult::args(vec!["b".into()])).expect("caller asked for progress");
        Ok(InvocationResult::args(vec!["c".into()]))
    });

    let (reg_id, _) = tokio::join!(register, async {
        match router.recv_msg().await {
            Msg::Register { request, .. } => {
                router.send_msg(&Msg::Registered { request, registration: 900 }).await;
            }
            other => panic!("expected REGISTER, got {:?}", other),
        }
    });
    let reg_id = reg_id.expect("register should succeed");

    let mut receive_progress = WampDict::new();
    receive_progress.insert("receive_progress".to_owned(), wampcore::Arg::Bool(true));
    router
        .send_msg(&Msg::Invocation {
            request: 1,
            registration: reg_id,
            details: receive_progress,
            arguments: None,
            arguments_kw: None,
        })
        .await;

    let mut yields = Vec::new();
    for _ in 0..3 {
        match router.recv_msg().await {
            Msg::Yield { request, options, arguments, .. } => {
                assert_eq!(request, 1);
                yields.push((options.get("progress").cloned(), arguments));
            }
            other => panic!("expected YIELD, got {:?}", other),
        }
    }

    assert_eq!(yields[0], (Some(wampcore::Arg::Bool(true)), Some(vec!["a".into()])));
    assert_eq!(yields[1], (Some(wampcore::Arg::Bool(true)), Some(vec!["b".into()])));
    assert_eq!(yields[2], (None, Some(vec!["c".into()])));
}

#[tokio::test]
async fn interrupt_is_handled_without_an_error_reply() {
    let (client, mut router) = joined_client(ClientConfig::default()).await;

    let register = client.register("slow.op", RegisterOptions::default(), |inv: Invocation| async move {
        inv.send_progress(InvocationResult::args(vec!["a".into()])).expect("caller asked for progress");
        let mode = inv.interrupt.cancelled().await;
        assert_eq!(mode, wampcore::CancelMode::KillNoWait);
        Ok(InvocationResult::args(vec!["plz no error".into()]))
    });

    let (reg_id, _) = tokio::join!(register, async {
        match router.recv_msg().await {
            Msg::Register { request, .. } => {
                router.send_msg(&Msg::Registered { request, registration: 901 }).await;
            }
            other => panic!("expected REGISTER, got {:?}", other),
        }
    });
    let reg_id = reg_id.expect("register should succeed");

    let mut receive_progress = WampDict::new();
    receive_progress.insert("receive_progress".to_owned(), wampcore::Arg::Bool(true));
    router
        .send_msg(&Msg::Invocation { request: 7, registration: reg_id, details: receive_progress, arguments: None, arguments_kw: None })
        .await;

    match router.recv_msg().await {
        Msg::Yield { request, options, arguments, .. } => {
            assert_eq!(request, 7);
            assert_eq!(options.get("progress"), Some(&wampcore::Arg::Bool(true)));
            assert_eq!(arguments, Some(vec!["a".into()]));
        }
        other => panic!("expected progress YIELD, got {:?}", other),
    }

    router.send_msg(&Msg::Interrupt { request: 7, options: WampDict::new() }).await;

    match router.recv_msg().await {
        Msg::Yield { request, options, arguments, .. } => {
            assert_eq!(request, 7);
            assert!(options.get("progress").is_none());
            assert_eq!(arguments, Some(vec!["plz no error".into()]));
        }
        other => panic!("expected final YIELD, got {:?}", other),
    }
}
