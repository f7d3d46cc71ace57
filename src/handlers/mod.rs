// Handlers by access tier:
// public (no auth) → protected (admin JWT, mutations behind the CSRF gate)
pub mod public;
pub mod protected;
