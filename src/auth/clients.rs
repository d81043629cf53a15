use std::fmt;

use oauth2::{AuthUrl, Client, ClientId, ClientSecret, RedirectUrl, TokenUrl, basic::BasicClient};
use serde::Deserialize;
use serde_json::Value;

use crate::{AppResult, GetField};

type ConfiguredClient = Client<oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>, oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardRevocableToken, oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>, oauth2::EndpointSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointSet>;

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Google,
    Github,
}

impl Provider {
    fn slug(&self) -> &str {
        use Provider::*;
        match self {
            Google => "google",
            Github => "github",
        }
    }

    fn env_prefix(&self) -> &str {
        use Provider::*;
        match self {
            Google => "GOOGLE",
            Github => "GITHUB",
        }
    }

    fn auth_url(&self) -> &str {
        use Provider::*;
        match self {
            Google => "https://accounts.google.com/o/oauth2/auth",
            Github => "https://github.com/login/oauth/authorize",
        }
    }

    fn token_url(&self) -> &str {
        use Provider::*;
        match self {
            Google => "https://oauth2.googleapis.com/token",
            Github => "https://github.com/login/oauth/access_token",
        }
    }

    pub(crate) fn userinfo_url(&self) -> &str {
        use Provider::*;
        match self {
            Google => "https://openidconnect.googleapis.com/v1/userinfo",
            Github => "https://api.github.com/user",
        }
    }

    pub(crate) fn scope(&self) -> &str {
        use Provider::*;
        match self {
            Google => "openid",
            Github => "read:user",
        }
    }

    /// Stable user id out of the provider's userinfo document.
    pub(crate) fn user_id(&self, userinfo: &Value) -> AppResult<String> {
        use Provider::*;
        match self {
            Google => Ok(format!("google:{}", userinfo.get_str_field("sub")?)),
            Github => {
                let id = userinfo
                    .get("id")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| anyhow::anyhow!("expected numeric id in {userinfo}"))?;
                Ok(format!("github:{id}"))
            }
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[derive(Clone)]
pub struct Clients {
    google_client: Option<ConfiguredClient>,
    github_client: Option<ConfiguredClient>,
}

impl Clients {
    pub fn from_env() -> AppResult<Clients> {
        Ok(Clients {
            google_client: configured(Provider::Google)?,
            github_client: configured(Provider::Github)?,
        })
    }

    pub fn get_client(&self, provider: Provider) -> AppResult<ConfiguredClient> {
        use Provider::*;
        match provider {
            Google => self.google_client.clone(),
            Github => self.github_client.clone(),
        }.ok_or(anyhow::anyhow!("OAuth provider {provider} keys not supplied").into())
    }
}

fn configured(provider: Provider) -> AppResult<Option<ConfiguredClient>> {
    let prefix = provider.env_prefix();
    let (Ok(client_id), Ok(client_secret)) = (
        dotenv::var(format!("{prefix}_CLIENT_ID")),
        dotenv::var(format!("{prefix}_CLIENT_SECRET")),
    ) else {
        return Ok(None);
    };

    let public_url = dotenv::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:8080".to_owned());

    let auth_url = AuthUrl::new(provider.auth_url().to_owned())?;
    let token_url = TokenUrl::new(provider.token_url().to_owned())?;
    let redirect_url = RedirectUrl::new(format!("{public_url}/lockin/{provider}"))?;

    Ok(Some(
        BasicClient::new(ClientId::new(client_id))
        .set_client_secret(ClientSecret::new(client_secret))
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_redirect_uri(redirect_url)
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn each_provider_derives_a_prefixed_user_id() {
        let google = serde_json::json!({"sub": "10769150350006150715113082367"});
        assert_eq!(
            Provider::Google.user_id(&google).unwrap(),
            "google:10769150350006150715113082367"
        );

        let github = serde_json::json!({"id": 583231, "login": "octocat"});
        assert_eq!(Provider::Github.user_id(&github).unwrap(), "github:583231");
    }

    #[test]
    fn a_userinfo_document_without_an_id_is_an_error() {
        assert!(Provider::Google.user_id(&serde_json::json!({})).is_err());
        assert!(Provider::Github.user_id(&serde_json::json!({"id": "not-a-number"})).is_err());
    }
}
