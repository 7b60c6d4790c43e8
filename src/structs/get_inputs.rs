use serde::{Deserialize, Serialize};

/// Query string of the protocol listings. The author, date range and sort
/// fields are only honoured by the admin listing.
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Search {
    pub region: Option<String>,
    pub examiner: Option<String>,
    pub hashtag: Option<String>,
    pub user: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct UserSearch {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Page {
    pub page: Option<i64>,
}

/// Anything but an explicit `asc` sorts descending.
pub fn is_descending(order: Option<&str>) -> bool {
    order != Some("asc")
}
