
use std::{net::Ipv4Addr, ops::RangeInclusive, time::Duration};

use anyhow::{anyhow, Context};
use reqwest::Client;
use tokio::select;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::race::{Race, RaceError};

/// Last octets probed by default.
pub const HOSTS: RangeInclusive<u8> = 2..=255;

pub fn make_robust_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .trust_dns(true)
        .use_rustls_tls()
        .build()
}

/// Looks for a host on a /24 subnet that answers `200 OK` on `port`.
#[derive(Clone)]
pub struct SubnetProbe {
    client: Client,
    subnet: [u8; 3],
    port: u16,
}

impl SubnetProbe {
    /// `subnet` is the first three octets, e.g. `192.168.1`.
    pub fn new(client: Client, subnet: &str, port: u16) -> anyhow::Result<Self> {
        let address = format!("{}.0", subnet)
            .parse::<Ipv4Addr>()
            .with_context(|| format!("invalid subnet {:?}", subnet))?;
        let [a, b, c, _] = address.octets();
        Ok(Self {
            client,
            subnet: [a, b, c],
            port,
        })
    }

    pub fn url_for(&self, host: u8) -> anyhow::Result<Url> {
        let [a, b, c] = self.subnet;
        let url = Url::parse(&format!("http://{}.{}.{}.{}:{}/", a, b, c, host, self.port))?;
        Ok(url)
    }

    pub async fn check(&self, scope: CancellationToken, host: u8) -> anyhow::Result<Url> {
        let url = self.url_for(host)?;
        let response = select! {
            biased;
            _ = scope.cancelled() => return Err(anyhow!("probe of {} cancelled", url)),
            response = self.client.get(url.clone()).send() => response?,
        };
        let status_code = response.status().as_u16();
        if status_code != 200 {
            tracing::debug!(%url, status_code, "host answered without 200");
            return Err(anyhow!("{} answered with status code {}", url, status_code));
        }
        Ok(url)
    }

    /// Races [`SubnetProbe::check`] over `hosts` and returns the first URL that answered.
    pub async fn find<Hosts>(
        &self,
        race: Race,
        cancel: &CancellationToken,
        hosts: Hosts,
    ) -> Result<Url, RaceError<anyhow::Error>>
    where
        Hosts: IntoIterator<Item = u8>,
        Hosts::IntoIter: ExactSizeIterator + Send + 'static,
    {
        let probe = self.clone();
        race.run(cancel, hosts, move |scope, host| {
            let probe = probe.clone();
            async move { probe.check(scope, host).await }
        })
        .await
    }
}
