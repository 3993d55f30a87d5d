mod auth;
mod bwlist;
mod call;
mod client;
mod common;
mod core;
mod error;
mod invocation;
mod message;
mod options;
mod serializer;
mod transport;

pub use auth::{
    Anonymous, AuthMethod, AuthKeyring, AuthenticateOutcome, AuthenticationChallengeResponse, Challenge, CryptoSign,
    Ticket, WampCra,
};
pub use bwlist::{BlackWhiteList, Receiver as BwlistReceiver};
pub use call::Call;
pub use client::{Client, ClientConfig, ClientState};
pub use common::*;
pub use core::SubscriptionQueue;
pub use error::*;
pub use invocation::{Interrupt, Invocation, InvocationResult, RpcFunc};
pub use options::{CallOptions, OptionBuilder, PublishOptions, RegisterOptions, SubscribeOptions, WampOption};
pub use serializer::{SerializerError, SerializerImpl, SerializerType};
pub use transport::{Transport, TransportError};
