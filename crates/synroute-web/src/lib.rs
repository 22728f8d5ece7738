//! synroute-web: browser front end for synthesis route planning.
//!
//! One page with a SMILES field. Submitting it shows the structure drawing,
//! then the route image returned by the prediction service, or the reason
//! there is none. The same action is available as JSON under `/api`.

pub mod router;
pub mod handlers;
pub mod state;
pub mod view;
