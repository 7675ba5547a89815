/*
 * Responsibility
 * - public surface of the middleware layer
 * - auth: session guard for protected routes; http/security_headers: transport concerns
 */
pub mod auth;
pub mod http;
pub mod security_headers;
