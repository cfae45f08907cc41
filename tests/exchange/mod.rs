//! Exchange resolver tests against scripted doubles and a wiremock feed.

mod http_feed;
