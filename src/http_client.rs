use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use crate::config;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(config::request_timeout())
            .user_agent(config::user_agent())
            .build()
            .context("failed to build http client")
    })
}
