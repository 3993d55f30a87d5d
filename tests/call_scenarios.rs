mod common;

use common::joined_client;
use wampcore::{CallOptions, ClientConfig, Msg, WampDict};

#[tokio::test]
async fn unary_call_happy_path() {
    let (client, mut router) = joined_client(ClientConfig::default()).await;
    let mut call = client.call("io.giesela.add", CallOptions::default(), Some(vec![1i64.into(), 3i64.into()]), None);

    let (result, _) = tokio::join!(call.result(), async {
        match router.recv_msg().await {
            Msg::Call { request, procedure, arguments, .. } => {
                assert_eq!(procedure, "io.giesela.add");
                assert_eq!(arguments, Some(vec![1i64.into(), 3i64.into()]));
                router
                    .send_msg(&Msg::Result {
                        request,
                        details: WampDict::new(),
                        arguments: Some(vec![4i64.into()]),
                        arguments_kw: None,
                    })
                    .await;
            }
            other => panic!("expected CALL, got {:?}", other),
        }
    });

    let (args, _) = result.expect("call should succeed");
    assert_eq!(args, Some(vec![4i64.into()]));
}

#[tokio::test]
async fn call_lazy_send_nothing_on_the_wire_until_awaited() {
    let (client, mut router) = joined_client(ClientConfig::default()).await;

    // Constructing the Call must not itself write anything to the transport.
    let mut call = client.call("slow.op", CallOptions::default(), None, None);

    // Give the event loop a chance to run if it were (incorrectly) going to
    // send something on its own.
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    let (result, _) = tokio::join!(call.result(), async {
        match router.recv_msg().await {
            Msg::Call { request, .. } => {
                router
                    .send_msg(&Msg::Result { request, details: WampDict::new(), arguments: None, arguments_kw: None })
                    .await;
            }
            other => panic!("expected CALL, got {:?}", other),
        }
    });
    result.expect("call should succeed");
}

#[tokio::test]
async fn progressive_call_delivers_progress_then_final() {
    let (client, mut router) = joined_client(ClientConfig::default()).await;
    let options = CallOptions::default().with_receive_progress(true);
    let kwargs: WampDict = [("iterations".to_owned(), wampcore::Arg::Integer(3))].into_iter().collect();
    let mut call = client.call("io.giesela.fibonacci", options, None, Some(kwargs));

    let mut progress_values = Vec::new();
    let router_task = async {
        let request = match router.recv_msg().await {
            Msg::Call { request, options, .. } => {
                assert_eq!(options.get("receive_progress"), Some(&wampcore::Arg::Bool(true)));
                request
            }
            other => panic!("expected CALL, got {:?}", other),
        };

        let mut progress_opts = WampDict::new();
        progress_opts.insert("progress".to_owned(), wampcore::Arg::Bool(true));
        router
            .send_msg(&Msg::Result { request, details: progress_opts.clone(), arguments: Some(vec![0i64.into()]), arguments_kw: None })
            .await;
        router
            .send_msg(&Msg::Result { request, details: progress_opts, arguments: Some(vec![1i64.into()]), arguments_kw: None })
            .await;
        router
            .send_msg(&Msg::Result { request, details: WampDict::new(), arguments: Some(vec![1i64.into()]), arguments_kw: None })
            .await;
    };

    let drain_progress = async {
        while let Some((args, _)) = call.progress().await.expect("progress channel should not error") {
            progress_values.push(args);
        }
    };

    tokio::join!(router_task, drain_progress);

    assert_eq!(progress_values, vec![Some(vec![0i64.into()]), Some(vec![1i64.into()])]);
    let (final_args, _) = call.result().await.expect("final result should succeed");
    assert_eq!(final_args, Some(vec![1i64.into()]));
}

#[tokio::test]
async fn cancellation_sends_cancel_and_swallows_canceled_error() {
    let (client, mut router) = joined_client(ClientConfig::default()).await;
    let mut call = client.call("slow.op", CallOptions::default(), None, None);

    let request = {
        let (_, request) = tokio::join!(call.cancel(wampcore::CancelMode::KillNoWait), async {
            match router.recv_msg().await {
                Msg::Call { request, .. } => request,
                other => panic!("expected CALL, got {:?}", other),
            }
        });
        request
    };

    // The cancel() call above both sends CALL (lazily) and CANCEL; the mock
    // router should see the CANCEL next.
    match router.recv_msg().await {
        Msg::Cancel { request: cancel_req, options } => {
            assert_eq!(cancel_req, request);
            assert_eq!(options.get("mode").and_then(|v| v.as_str()), Some("killnowait"));
        }
        other => panic!("expected CANCEL, got {:?}", other),
    }

    router
        .send_msg(&Msg::Error {
            request_type: wampcore::CALL as wampcore::WampInteger,
            request,
            details: WampDict::new(),
            error: wampcore::ERR_CANCELED.to_owned(),
            arguments: None,
            arguments_kw: None,
        })
        .await;

    let err = call.result().await.expect_err("canceled call should surface as an error");
    assert!(err.is_canceled());
}
