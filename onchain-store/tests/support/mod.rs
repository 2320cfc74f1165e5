//! A minimal `testcontainers::Image` for Postgres, in the same hand-rolled
//! style as `bs_containers::jade::JadeEmulator` — no `-modules` crate pulled
//! in for a one-off Postgres instance.

use testcontainers::{core::WaitFor, Image, ImageArgs};

#[derive(Debug, Default)]
pub struct Postgres;

#[derive(Clone, Debug, Default)]
struct Args;

impl ImageArgs for Args {
    fn into_iterator(self) -> Box<dyn Iterator<Item = String>> {
        Box::new(std::iter::empty())
    }
}

impl Image for Postgres {
    type Args = Args;

    fn name(&self) -> String {
        "postgres".to_string()
    }

    fn tag(&self) -> String {
        "16-alpine".to_string()
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        )]
    }

    fn env_vars(&self) -> Box<dyn Iterator<Item = (String, String)>> {
        Box::new(
            [
                ("POSTGRES_USER".to_string(), "onchain".to_string()),
                ("POSTGRES_PASSWORD".to_string(), "onchain".to_string()),
                ("POSTGRES_DB".to_string(), "onchain".to_string()),
            ]
            .into_iter(),
        )
    }

    fn expose_ports(&self) -> Vec<u16> {
        vec![5432]
    }
}
