pub mod file;

use axum::routing::MethodFilter;

/// Every route the service answers. Anything else gets the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Get,
    List,
    Create,
    Delete,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Get, Route::List, Route::Create, Route::Delete];

    pub fn path(self) -> &'static str {
        match self {
            Route::Get => "/get",
            Route::List => "/list",
            Route::Create => "/create",
            Route::Delete => "/delete",
        }
    }

    pub fn method_filter(self) -> MethodFilter {
        match self {
            Route::Get | Route::List => MethodFilter::GET,
            Route::Create => MethodFilter::POST,
            Route::Delete => MethodFilter::DELETE,
        }
    }
}
