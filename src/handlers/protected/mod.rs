// Protected handlers: admin access token required.
// Mutating handlers additionally require the CSRF gate.
pub mod customers;
