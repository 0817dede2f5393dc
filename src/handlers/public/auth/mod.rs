// handlers/public/auth/mod.rs - Session acquisition and release
//
// All of these talk to the identity provider and write session cookies
// themselves; the session middleware leaves their cookies alone.

pub mod callback; // GET /auth/callback - PKCE code exchange
pub mod login;    // GET/POST /auth/login
pub mod logout;   // POST /auth/logout
pub mod signup;   // POST /auth/signup
pub mod utils;

pub use callback::callback_get;
pub use login::{login_get, login_post};
pub use logout::logout_post;
pub use signup::signup_post;
