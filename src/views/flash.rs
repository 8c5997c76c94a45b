//! One-shot status messages carried across a redirect in a cookie.

use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;

const FLASH_COOKIE: &str = "flash";

/// Redirect to `to`, showing `message` on the next page.
pub fn redirect(jar: CookieJar, to: &str, message: &str) -> (CookieJar, Redirect) {
    let encoded: String = form_urlencoded::byte_serialize(message.as_bytes()).collect();
    let cookie = Cookie::build((FLASH_COOKIE, encoded))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (jar.add(cookie), Redirect::to(to))
}

/// Read and clear the pending message.
pub fn take(jar: CookieJar) -> (CookieJar, Option<String>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };

    let message = form_urlencoded::parse(format!("m={}", cookie.value()).as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .filter(|m| !m.is_empty());

    let removal = Cookie::build((FLASH_COOKIE, "")).path("/").build();
    (jar.remove(removal), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_survives_the_cookie() {
        let (jar, _) = redirect(CookieJar::new(), "/teams", "Team \"Vendas & Co\" created");
        let (_, message) = take(jar);
        assert_eq!(message.as_deref(), Some("Team \"Vendas & Co\" created"));
    }

    #[test]
    fn no_cookie_no_message() {
        let (_, message) = take(CookieJar::new());
        assert!(message.is_none());
    }
}
