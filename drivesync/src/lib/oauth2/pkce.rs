use std::{borrow::Cow, collections::HashMap, net::SocketAddr};

use oauth2::{basic::BasicTokenResponse, AuthorizationCode, CsrfToken, PkceCodeChallenge, RedirectUrl, Scope};
use tokio::{io, net};

use super::{redirect, Client};
use crate::error;

impl Client {
    /// Runs the authorization code flow with PKCE.
    /// The user consents in the browser, which is then redirected to a
    /// one-shot HTTP listener on the loopback interface.
    pub(super) async fn fetch_token_pkce(&self, scopes: Vec<Scope>) -> dsync::Result<BasicTokenResponse> {
        log::info!("Starting PKCE flow for scopes {scopes:?}");

        let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
        let listener = net::TcpListener::bind(&addr).await?;
        let redirect_addr = listener.local_addr()?;

        let redirect_url = RedirectUrl::new(format!("http://{redirect_addr}")).map_err(error::auth)?;
        let redirect_url = Cow::Borrowed(&redirect_url);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_state) = self
            .inner
            .oauth2
            .authorize_url(CsrfToken::new_random)
            .set_redirect_uri(redirect_url.clone())
            .add_scopes(scopes)
            .set_pkce_challenge(pkce_challenge)
            .url();

        log::info!("Opening browser to {auth_url}");
        tokio::task::spawn_blocking(move || {
            if let Err(err) = webbrowser::open(auth_url.as_str()) {
                log::error!("Could not open a browser ({err}). Please visit {auth_url}");
            }
        });

        log::trace!("waiting for redirection on {redirect_addr}");
        let (socket, addr) = listener.accept().await?;

        log::trace!("incoming request from {addr}");
        let (reader, writer) = io::split(socket);
        let reader = io::BufReader::new(reader);
        let writer = io::BufWriter::new(writer);
        let target = redirect::read_request_target(reader).await?;
        let query = parse_query(&target);

        let code = query
            .get("code")
            .cloned()
            .map(AuthorizationCode::new)
            .ok_or_else(|| {
                dsync::auth_error!(
                    "'code' was not returned by {}",
                    self.inner.oauth2.auth_url().as_str()
                )
            })?;
        let state = query.get("state").cloned().map(CsrfToken::new).ok_or_else(|| {
            dsync::auth_error!(
                "'state' was not returned by {}",
                self.inner.oauth2.auth_url().as_str()
            )
        })?;

        if state.secret() != csrf_state.secret() {
            log::error!("Failed PKCE challenge");
            redirect::write_response(writer, 401, "Could not verify the CSRF token :-(").await?;
            dsync::auth_bail!("Could not verify the CSRF token");
        }

        log::trace!("exchanging code for token");

        let token_response = self
            .inner
            .oauth2
            .exchange_code(code)
            .set_pkce_verifier(pkce_verifier)
            .set_redirect_uri(redirect_url)
            .request_async(|req| async move { self.http(req).await })
            .await
            .map_err(error::auth)?;

        redirect::write_response(writer, 200, "All good, you can close this window ;-)").await?;

        Ok(token_response)
    }
}

/// Query parameters of a request target such as `/?code=abc&state=xyz`
fn parse_query(target: &str) -> HashMap<String, String> {
    let query = target.split_once('?').map(|(_, q)| q).unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}
