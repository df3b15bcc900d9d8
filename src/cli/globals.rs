use secrecy::SecretString;

/// Settings shared across actions: the session signing secret and the
/// notification-gateway credentials. Held here (not in process globals) and
/// injected into whatever needs them.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub session_secret: SecretString,
    pub notify_url: Option<String>,
    pub notify_token: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(session_secret: SecretString) -> Self {
        Self {
            session_secret,
            notify_url: None,
            notify_token: SecretString::default(),
        }
    }

    pub fn set_notify(&mut self, url: Option<String>, token: SecretString) {
        self.notify_url = url;
        self.notify_token = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let mut args = GlobalArgs::new(SecretString::from("sekreta".to_string()));
        assert_eq!(args.session_secret.expose_secret(), "sekreta");
        assert_eq!(args.notify_url, None);
        assert_eq!(args.notify_token.expose_secret(), "");

        args.set_notify(
            Some("https://notify.example.test".to_string()),
            SecretString::from("token".to_string()),
        );
        assert_eq!(
            args.notify_url.as_deref(),
            Some("https://notify.example.test")
        );
    }
}
