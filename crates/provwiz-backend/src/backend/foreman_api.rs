//! Foreman HTTP client.
//!
//! Inventory lookups go through the Foreman API v2. The provisioner record and
//! wizard handlers live under the foreman_setup plugin routes and are driven
//! with JSON bodies shaped like the wizard's HTML forms.

use super::{InventoryOps, ProvisionerOps, WizardOps};
use crate::types::{Host, Hostgroup, Medium, NewProvisioner, Provisioner, SmartProxy};
use crate::{BackendError, BackendResult};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{redirect, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const PROVISIONERS: &str = "foreman_setup/provisioners";

#[derive(Debug, Clone)]
pub struct ForemanApiConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ForemanApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost".to_string(),
            username: None,
            password: None,
            timeout_secs: 60,
            user_agent: "provwiz".to_string(),
        }
    }
}

/// Foreman's list envelope.
#[derive(Debug, Deserialize)]
struct Results<T> {
    results: Vec<T>,
}

pub struct ForemanApi {
    client: Client,
    base: Url,
    username: Option<String>,
    password: Option<String>,
}

fn http_err(err: reqwest::Error) -> BackendError {
    BackendError::Http(err.to_string())
}

/// A 2xx or 3xx answer. `location` is only set for redirects.
struct Reply {
    body: String,
    location: Option<String>,
}

/// Provisioner id in a redirect target such as
/// `/foreman_setup/provisioners/9/step2`.
fn provisioner_id_from_location(location: &str) -> Option<u64> {
    let path = match Url::parse(location) {
        Ok(url) => url.path().to_string(),
        Err(_) => location.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let mut segments = path.split('/');
    segments.find(|segment| *segment == "provisioners")?;
    segments.next()?.parse().ok()
}

/// Host part of a proxy URL such as `https://foreman.example.org:8443`.
fn url_host(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

impl ForemanApi {
    pub fn new(cfg: &ForemanApiConfig) -> BackendResult<Self> {
        let mut base = Url::parse(&cfg.base_url).map_err(|e| {
            BackendError::Other(format!("invalid Foreman URL {}: {}", cfg.base_url, e))
        })?;
        // Url::join replaces the last path segment unless the base ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(cfg.user_agent.as_str())
            .redirect(redirect::Policy::none())
            .build()
            .map_err(http_err)?;
        Ok(Self {
            client,
            base,
            username: cfg.username.clone(),
            password: cfg.password.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> BackendResult<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| BackendError::Other(format!("invalid endpoint {path}: {e}")))
    }

    /// Send a request; `Ok(None)` means 404 and is only produced when
    /// `allow_missing` is set.
    fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        allow_missing: bool,
    ) -> BackendResult<Option<Reply>> {
        log::debug!("{} {}", method, url);
        let mut req = self
            .client
            .request(method.clone(), url.clone())
            .header(ACCEPT, "application/json");
        if let Some(user) = &self.username {
            req = req.basic_auth(user, self.password.as_deref());
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().map_err(http_err)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND && allow_missing {
            return Ok(None);
        }
        let mut location = None;
        if status.is_redirection() {
            location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            log::debug!("{} {} redirected to {:?}", method, url, location);
        } else if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        let body = response.text().map_err(http_err)?;
        Ok(Some(Reply { body, location }))
    }

    fn decode<T: DeserializeOwned>(url: &Url, body: &str) -> BackendResult<T> {
        serde_json::from_str(body).map_err(|e| BackendError::Decode(format!("{url}: {e}")))
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> BackendResult<Option<T>> {
        match self.send(Method::GET, url.clone(), None, true)? {
            Some(reply) => Ok(Some(Self::decode(&url, &reply.body)?)),
            None => Ok(None),
        }
    }

    fn search<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> BackendResult<Vec<T>> {
        let mut url = self.endpoint(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(self
            .get_json::<Results<T>>(url)?
            .map(|r| r.results)
            .unwrap_or_default())
    }

    fn provisioner_url(&self, id: u64, action: Option<&str>) -> BackendResult<Url> {
        match action {
            Some(action) => self.endpoint(&format!("{PROVISIONERS}/{id}/{action}")),
            None => self.endpoint(&format!("{PROVISIONERS}/{id}")),
        }
    }

    /// Run a wizard handler and fold any JSON provisioner it returns back into
    /// the in-memory copy. Form handlers may answer with a redirect or HTML,
    /// which leaves the copy untouched.
    fn handler(
        &self,
        method: Method,
        provisioner: &mut Provisioner,
        action: &str,
        params: Option<&Value>,
    ) -> BackendResult<()> {
        let url = self.provisioner_url(provisioner.id, Some(action))?;
        let Some(reply) = self.send(method, url, params, false)? else {
            return Ok(());
        };
        if let Ok(updated) = serde_json::from_str::<Provisioner>(&reply.body) {
            let step = provisioner.wizard_step;
            *provisioner = updated;
            provisioner.wizard_step = step;
        }
        Ok(())
    }
}

impl InventoryOps for ForemanApi {
    fn find_proxy_by_hostname(&self, fqdn: &str) -> BackendResult<Option<SmartProxy>> {
        let proxies: Vec<SmartProxy> = self.search("api/smart_proxies", &[("search", fqdn)])?;
        Ok(proxies.into_iter().find(|p| {
            p.name == fqdn || p.url.as_deref().and_then(url_host).as_deref() == Some(fqdn)
        }))
    }

    fn find_host_by_hostname(&self, fqdn: &str) -> BackendResult<Option<Host>> {
        let url = self.endpoint(&format!("api/hosts/{fqdn}"))?;
        self.get_json(url)
    }

    fn find_medium_by_name(&self, name: &str) -> BackendResult<Option<Medium>> {
        let search = format!("name=\"{name}\"");
        let media: Vec<Medium> = self.search("api/media", &[("search", search.as_str())])?;
        Ok(media.into_iter().find(|m| m.name == name))
    }

    fn list_hostgroups(&self) -> BackendResult<Vec<Hostgroup>> {
        self.search("api/hostgroups", &[("per_page", "all")])
    }

    fn delete_hostgroup(&self, id: u64) -> BackendResult<()> {
        let url = self.endpoint(&format!("api/hostgroups/{id}"))?;
        self.send(Method::DELETE, url, None, false)?;
        Ok(())
    }
}

impl ProvisionerOps for ForemanApi {
    fn create_provisioner(&self, new: &NewProvisioner) -> BackendResult<Provisioner> {
        let url = self.endpoint(PROVISIONERS)?;
        let body = json!({ "foreman_setup_provisioner": new });
        let reply = self
            .send(Method::POST, url.clone(), Some(&body), false)?
            .ok_or_else(|| BackendError::Decode(format!("{url}: empty create response")))?;
        // The wizard's create action redirects to step 2 of the new record.
        if let Some(location) = reply.location {
            let id = provisioner_id_from_location(&location).ok_or_else(|| {
                BackendError::Decode(format!("{url}: no provisioner id in redirect to {location}"))
            })?;
            return self.find_provisioner(id);
        }
        Self::decode(&url, &reply.body)
    }

    fn find_provisioner(&self, id: u64) -> BackendResult<Provisioner> {
        let url = self.provisioner_url(id, None)?;
        self.get_json(url)?.ok_or_else(|| BackendError::NotFound {
            kind: "provisioner",
            key: id.to_string(),
        })
    }
}

impl WizardOps for ForemanApi {
    fn step2_update(&self, provisioner: &mut Provisioner, params: &Value) -> BackendResult<()> {
        self.handler(Method::PUT, provisioner, "step2_update", Some(params))
    }

    fn step4(&self, provisioner: &mut Provisioner) -> BackendResult<()> {
        self.handler(Method::GET, provisioner, "step4", None)
    }

    fn step4_update(&self, provisioner: &mut Provisioner, params: &Value) -> BackendResult<()> {
        self.handler(Method::PUT, provisioner, "step4_update", Some(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{DELETE, GET, POST, PUT};
    use httpmock::MockServer;

    fn api(server: &MockServer) -> ForemanApi {
        ForemanApi::new(&ForemanApiConfig {
            base_url: server.base_url(),
            username: Some("admin".to_string()),
            password: Some("changeme".to_string()),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn proxy_lookup_matches_url_host() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/smart_proxies")
                .query_param("search", "foreman.example.org")
                .header_exists("authorization");
            then.status(200).json_body(json!({
                "results": [
                    {"id": 1, "name": "other", "url": "https://other.example.org:8443"},
                    {"id": 2, "name": "Main proxy", "url": "https://foreman.example.org:8443"}
                ]
            }));
        });

        let proxy = api(&server)
            .find_proxy_by_hostname("foreman.example.org")
            .unwrap()
            .unwrap();
        assert_eq!(proxy.id, 2);
        mock.assert();
    }

    #[test]
    fn missing_host_is_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/hosts/foreman.example.org");
            then.status(404).body("{}");
        });
        assert!(api(&server)
            .find_host_by_hostname("foreman.example.org")
            .unwrap()
            .is_none());
    }

    #[test]
    fn server_errors_become_status_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/hosts/foreman.example.org");
            then.status(500).body("boom");
        });
        let err = api(&server)
            .find_host_by_hostname("foreman.example.org")
            .unwrap_err();
        match err {
            BackendError::Status { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn medium_lookup_requires_exact_name() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/media")
                .query_param("search", "name=\"CentOS mirror\"");
            then.status(200).json_body(json!({
                "results": [
                    {"id": 3, "name": "CentOS mirror (old)"},
                    {"id": 4, "name": "CentOS mirror"}
                ]
            }));
        });
        let medium = api(&server)
            .find_medium_by_name("CentOS mirror")
            .unwrap()
            .unwrap();
        assert_eq!(medium.id, 4);
    }

    #[test]
    fn create_provisioner_posts_wrapped_attributes() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/foreman_setup/provisioners")
                .json_body(json!({
                    "foreman_setup_provisioner": {
                        "host_id": 5,
                        "smart_proxy_id": 6,
                        "provision_interface": "eth0"
                    }
                }));
            then.status(201).json_body(json!({
                "id": 9, "host_id": 5, "smart_proxy_id": 6, "provision_interface": "eth0"
            }));
        });

        let p = api(&server)
            .create_provisioner(&NewProvisioner {
                host_id: 5,
                smart_proxy_id: 6,
                provision_interface: "eth0".to_string(),
            })
            .unwrap();
        assert_eq!(p.id, 9);
        mock.assert();
    }

    #[test]
    fn create_provisioner_follows_wizard_redirect() {
        let server = MockServer::start();
        let create = server.mock(|when, then| {
            when.method(POST).path("/foreman_setup/provisioners");
            then.status(302)
                .header("Location", "/foreman_setup/provisioners/9/step2");
        });
        let reload = server.mock(|when, then| {
            when.method(GET).path("/foreman_setup/provisioners/9");
            then.status(200).json_body(json!({
                "id": 9, "host_id": 5, "smart_proxy_id": 6, "provision_interface": "eth0"
            }));
        });

        let p = api(&server)
            .create_provisioner(&NewProvisioner {
                host_id: 5,
                smart_proxy_id: 6,
                provision_interface: "eth0".to_string(),
            })
            .unwrap();
        assert_eq!(p.id, 9);
        assert_eq!(p.provision_interface, "eth0");
        create.assert();
        reload.assert();
    }

    #[test]
    fn create_redirect_without_id_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/foreman_setup/provisioners");
            then.status(302).header("Location", "/users/login");
        });
        let err = api(&server)
            .create_provisioner(&NewProvisioner {
                host_id: 5,
                smart_proxy_id: 6,
                provision_interface: "eth0".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[test]
    fn redirect_targets_yield_provisioner_ids() {
        assert_eq!(
            provisioner_id_from_location("/foreman_setup/provisioners/9/step2"),
            Some(9)
        );
        assert_eq!(
            provisioner_id_from_location(
                "https://foreman.example.org/foreman_setup/provisioners/12/step2?x=1"
            ),
            Some(12)
        );
        assert_eq!(provisioner_id_from_location("/foreman_setup/provisioners/new"), None);
    }

    #[test]
    fn handlers_accept_redirects_and_keep_memory_copy() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/foreman_setup/provisioners/9/step2_update")
                .json_body(json!({"foreman_setup_provisioner": {"domain_name": "x"}}));
            then.status(302)
                .header("Location", "/foreman_setup/provisioners/9/step3");
        });

        let mut p = Provisioner {
            id: 9,
            host_id: 5,
            smart_proxy_id: 6,
            provision_interface: "eth0".to_string(),
            hostgroup_id: None,
            subnet_id: None,
            domain_id: None,
            wizard_step: Some(1),
        };
        let before = p.clone();
        api(&server)
            .step2_update(&mut p, &json!({"foreman_setup_provisioner": {"domain_name": "x"}}))
            .unwrap();
        assert_eq!(p, before);
        mock.assert();
    }

    #[test]
    fn hostgroups_list_and_delete() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/hostgroups")
                .query_param("per_page", "all");
            then.status(200)
                .json_body(json!({"results": [{"id": 1, "name": "Base"}]}));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/api/hostgroups/1");
            then.status(200).json_body(json!({}));
        });

        let api = api(&server);
        let groups = api.list_hostgroups().unwrap();
        assert_eq!(groups.len(), 1);
        api.delete_hostgroup(groups[0].id).unwrap();
        delete.assert();
    }

    #[test]
    fn base_url_with_prefix_is_preserved() {
        let api = ForemanApi::new(&ForemanApiConfig {
            base_url: "https://foreman.example.org/foreman".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            api.endpoint("api/hosts/a").unwrap().as_str(),
            "https://foreman.example.org/foreman/api/hosts/a"
        );
    }
}
