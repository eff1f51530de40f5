//! Shared-memory transport against a controller fixture.

mod common;

use std::time::Duration;

use common::{ShmController, machine_on};
use copilot_client::{Session, SessionSettings, ShmTransport, StatusPoll, Transport, TransportError};
use copilot_common::command::{Command, CommandMessage};
use copilot_common::message::{CHANNEL_TEXT_TAG, MessageKind, OPERATOR_ERROR_TAG};
use copilot_common::status::TaskMode;

fn open(controller: &ShmController) -> ShmTransport {
    let mut transport = ShmTransport::new(controller.config.clone());
    transport.open().expect("attach channels");
    transport
}

#[test]
fn status_is_peeked_until_it_changes() {
    let mut controller = ShmController::start();
    let mut transport = open(&controller);

    assert_eq!(transport.poll_status().unwrap(), StatusPoll::Unchanged);

    let mut snapshot = machine_on(3);
    snapshot.task.mode = TaskMode::Auto;
    controller.publish_status(&snapshot);

    match transport.poll_status().unwrap() {
        StatusPoll::New(got) => assert_eq!(*got, snapshot),
        StatusPoll::Unchanged => panic!("expected a new snapshot"),
    }
    assert_eq!(transport.poll_status().unwrap(), StatusPoll::Unchanged);
}

#[test]
fn only_the_latest_status_is_seen() {
    let mut controller = ShmController::start();
    let mut transport = open(&controller);

    for echo in 1..=5 {
        controller.publish_status(&machine_on(echo));
    }
    match transport.poll_status().unwrap() {
        StatusPoll::New(got) => assert_eq!(got.echo_serial_number, 5),
        StatusPoll::Unchanged => panic!("expected a new snapshot"),
    }
}

#[test]
fn command_mailbox_rejects_second_send_until_consumed() {
    let mut controller = ShmController::start();
    let mut transport = open(&controller);

    let first = CommandMessage::new(1, Command::TaskAbort);
    transport.send(&first).unwrap();

    let second = CommandMessage::new(2, Command::LubeOn);
    assert!(matches!(
        transport.send(&second),
        Err(TransportError::ChannelFull)
    ));

    assert_eq!(controller.next_command(), Some(first));
    transport.send(&second).unwrap();
    assert_eq!(controller.next_command(), Some(second));
    assert_eq!(controller.next_command(), None);
}

#[test]
fn operator_messages_are_consumed_once() {
    let mut controller = ShmController::start();
    let mut transport = open(&controller);

    assert_eq!(transport.poll_error().unwrap(), None);

    controller.post_message(OPERATOR_ERROR_TAG, "following error");
    let message = transport.poll_error().unwrap().expect("message");
    assert_eq!(message.kind, MessageKind::Error);
    assert_eq!(message.text, "following error");
    assert_eq!(transport.poll_error().unwrap(), None);

    controller.post_message(CHANNEL_TEXT_TAG, "hello");
    assert_eq!(
        transport.poll_error().unwrap().map(|m| m.kind),
        Some(MessageKind::Text)
    );
}

#[test]
fn unknown_message_tag_is_reported_and_consumed() {
    let mut controller = ShmController::start();
    let mut transport = open(&controller);

    controller.post_message(0x7777, "???");
    assert!(matches!(
        transport.poll_error(),
        Err(TransportError::UnrecognizedMessage { tag: 0x7777 })
    ));
    // The mailbox was freed, so the controller can post again.
    controller.post_message(OPERATOR_ERROR_TAG, "next");
    assert!(transport.poll_error().unwrap().is_some());
}

#[test]
fn calls_before_open_fail() {
    let controller = ShmController::start();
    let mut transport = ShmTransport::new(controller.config.clone());
    assert!(!transport.is_open());
    assert!(matches!(transport.poll_status(), Err(TransportError::NotOpen)));
    assert!(matches!(
        transport.send(&CommandMessage::new(1, Command::TaskAbort)),
        Err(TransportError::NotOpen)
    ));
}

#[test]
fn session_round_trip_over_shared_memory() {
    let mut controller = ShmController::start();
    controller.publish_status(&machine_on(20));

    let settings = SessionSettings {
        poll_interval: Duration::from_millis(5),
        ..SessionSettings::default()
    };
    let mut session = Session::new(Box::new(ShmTransport::new(controller.config.clone())), settings);
    session.connect().unwrap();
    assert_eq!(session.serial(), 20);

    let serial = session.send(Command::TaskPlanOpen {
        file: "/nc/part.ngc".into(),
    })
    .unwrap();
    let mut tracker = session.tracker(serial);

    let received = controller.next_command().expect("command in mailbox");
    assert_eq!(received.serial_number, 21);
    controller.publish_status(&machine_on(received.serial_number));

    session.wait(&mut tracker).unwrap();
    assert_eq!(session.status().echo_serial_number, 21);
}
