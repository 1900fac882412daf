use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

const MAX_REDIRECTS: usize = 10;

pub fn client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .build()
}
