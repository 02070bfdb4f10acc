mod support;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use url::Url;
// self
use ags_broker::{
	acquire::TokenAcquirer,
	auth::Credentials,
	error::{AuthError, Error},
	http::{ReqwestHttpClient, RestMethod, RestResponse},
};
use support::{BASE_URL, ScriptedHttpClient, path, scripted_acquirer, token_body};

const INFO_PATH: &str = "/arcgis/rest/info";
const ADMIN_PATH: &str = "/arcgis/admin/generateToken";
const TOKEN_PATH: &str = "/arcgis/tokens/generateToken";

fn reqwest_acquirer(server: &MockServer) -> TokenAcquirer<ReqwestHttpClient> {
	let base = Url::parse(&server.url("/arcgis")).expect("Mock base URL should parse.");

	TokenAcquirer::<ReqwestHttpClient>::new(base, ReqwestHttpClient::default())
}

fn info_body(token_services_url: &str) -> String {
	format!(
		"{{\"currentVersion\":11.1,\"authInfo\":{{\"isTokenBasedSecurity\":true,\"tokenServicesUrl\":\"{token_services_url}\"}}}}"
	)
}

fn scripted_info(http: &ScriptedHttpClient) {
	http.respond_json(RestMethod::Get, &path("rest/info"), &[&info_body(&format!(
		"{BASE_URL}/tokens/generateToken"
	))]);
}

#[tokio::test]
async fn admin_success_never_touches_discovery() {
	let server = MockServer::start_async().await;
	let admin = server
		.mock_async(|when, then| {
			when.method(POST).path(ADMIN_PATH).header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("admin-token", time::Duration::hours(1)));
		})
		.await;
	let info = server
		.mock_async(|when, then| {
			when.method(GET).path(INFO_PATH);
			then.status(200).body(info_body("unused"));
		})
		.await;
	let token = reqwest_acquirer(&server)
		.generate_token(&Credentials::new("gis", "pw"))
		.await
		.expect("Admin token request should succeed.");

	assert_eq!(token.secret().expose(), "admin-token");

	admin.assert_calls_async(1).await;
	info.assert_calls_async(0).await;
}

#[tokio::test]
async fn admin_failure_falls_back_to_form_exchange() {
	let server = MockServer::start_async().await;
	let admin = server
		.mock_async(|when, then| {
			when.method(POST).path(ADMIN_PATH);
			then.status(500).body("Internal error");
		})
		.await;
	let info = server
		.mock_async(|when, then| {
			when.method(GET).path(INFO_PATH).query_param("f", "json");
			then.status(200)
				.header("content-type", "application/json")
				.body(info_body(&server.url(TOKEN_PATH)));
		})
		.await;
	let exchange = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("form-token", time::Duration::hours(1)));
		})
		.await;
	let token = reqwest_acquirer(&server)
		.generate_token(&Credentials::new("gis", "pw"))
		.await
		.expect("Fallback exchange should succeed.");

	assert_eq!(token.secret().expose(), "form-token");

	admin.assert_calls_async(1).await;
	info.assert_calls_async(1).await;
	exchange.assert_calls_async(1).await;
}

#[tokio::test]
async fn domain_credentials_use_the_network_credential_exchange() {
	let server = MockServer::start_async().await;
	let _admin = server
		.mock_async(|when, then| {
			when.method(POST).path(ADMIN_PATH);
			then.status(200).body(r#"{"error":{"code":403,"message":"Forbidden"}}"#);
		})
		.await;
	let _info = server
		.mock_async(|when, then| {
			when.method(GET).path(INFO_PATH);
			then.status(200).body(info_body(&server.url(TOKEN_PATH)));
		})
		.await;
	let server_url = server.url("/arcgis/rest/services");
	let authority = server.address().to_string();
	let exchange = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(TOKEN_PATH)
				.query_param("request", "getToken")
				.query_param("serverUrl", server_url.as_str())
				.query_param("referer", authority.as_str())
				.query_param("f", "json")
				.header("authorization", "Basic Q09SUFxnaXM6cHc=");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("iwa-token", time::Duration::hours(1)));
		})
		.await;
	let token = reqwest_acquirer(&server)
		.generate_token(&Credentials::new("gis", "pw").with_domain("CORP"))
		.await
		.expect("Network credential exchange should succeed.");

	assert_eq!(token.secret().expose(), "iwa-token");

	exchange.assert_calls_async(1).await;
}

#[tokio::test]
async fn admin_request_uses_requestip_and_pjson() {
	let http = Arc::new(ScriptedHttpClient::new());

	http.respond_json(RestMethod::Post, &path("admin/generateToken"), &[&token_body(
		"admin-token",
		time::Duration::hours(1),
	)]);

	scripted_acquirer(&http)
		.generate_token(&Credentials::new("gis", "pw"))
		.await
		.expect("Admin token request should succeed.");

	let admin = &http.requests_to("/admin/generateToken")[0];

	assert_eq!(admin.method, RestMethod::Post);
	assert_eq!(admin.param_value("username"), Some("gis"));
	assert_eq!(admin.param_value("password"), Some("pw"));
	assert_eq!(admin.param_value("client"), Some("requestip"));
	assert_eq!(admin.param_value("f"), Some("pjson"));
}

#[tokio::test]
async fn near_expiry_admin_token_falls_back_with_base_url_referer() {
	let http = Arc::new(ScriptedHttpClient::new());

	http.respond_json(RestMethod::Post, &path("admin/generateToken"), &[&token_body(
		"short-lived",
		time::Duration::minutes(2),
	)]);
	scripted_info(&http);
	http.respond_json(RestMethod::Post, &path("tokens/generateToken"), &[&token_body(
		"fallback",
		time::Duration::hours(1),
	)]);

	let token = scripted_acquirer(&http)
		.generate_token(&Credentials::new("gis", "pw"))
		.await
		.expect("Fallback should replace the short-lived admin token.");

	assert_eq!(token.secret().expose(), "fallback");

	let exchange = &http.requests_to("/tokens/generateToken")[0];

	assert_eq!(exchange.param_value("client"), Some("referer"));
	assert_eq!(exchange.param_value("referer"), Some(BASE_URL));
	assert_eq!(exchange.param_value("f"), Some("json"));
}

#[tokio::test]
async fn discovery_form_exchange_uses_requestip_without_referer() {
	let http = Arc::new(ScriptedHttpClient::new());

	scripted_info(&http);
	http.respond_json(RestMethod::Post, &path("tokens/generateToken"), &[&token_body(
		"discovered",
		time::Duration::hours(1),
	)]);

	let acquirer = scripted_acquirer(&http);

	acquirer.acquire(&Credentials::new("gis", "pw")).await.expect("Acquisition should succeed.");
	acquirer
		.acquire(&Credentials::new("gis", "pw").with_referer("https://app.example.com"))
		.await
		.expect("Acquisition with referer should succeed.");

	let exchanges = http.requests_to("/tokens/generateToken");

	assert_eq!(exchanges[0].param_value("client"), Some("requestip"));
	assert_eq!(exchanges[0].param_value("referer"), None);
	assert_eq!(exchanges[1].param_value("client"), Some("referer"));
	assert_eq!(exchanges[1].param_value("referer"), Some("https://app.example.com"));
	assert!(http.requests_to("/admin/generateToken").is_empty());
}

#[tokio::test]
async fn missing_token_service_fails_discovery() {
	let http = Arc::new(ScriptedHttpClient::new());

	http.respond_json(RestMethod::Get, &path("rest/info"), &[r#"{"authInfo":{"isTokenBasedSecurity":false}}"#]);

	let err = scripted_acquirer(&http)
		.acquire(&Credentials::new("gis", "pw"))
		.await
		.expect_err("Discovery without a token service should fail.");

	assert!(matches!(err, Error::Auth(AuthError::DiscoveryFailed { .. })));
	assert!(http.requests_to("/tokens/generateToken").is_empty());
}

#[tokio::test]
async fn exchange_errors_surface_as_acquisition_failures() {
	let http = Arc::new(ScriptedHttpClient::new());

	scripted_info(&http);
	http.respond(RestMethod::Post, &path("tokens/generateToken"), vec![RestResponse::new(
		200,
		r#"{"error":{"code":400,"message":"Unable to generate token.","details":["Invalid username or password."]}}"#,
	)]);

	let err = scripted_acquirer(&http)
		.acquire(&Credentials::new("gis", "wrong"))
		.await
		.expect_err("Rejected credentials should fail.");

	match &err {
		Error::Auth(AuthError::AcquisitionFailed { source: Some(source), .. }) => {
			assert!(source.to_string().contains("Invalid username or password."));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn proxy_prefixes_every_request() {
	let http = Arc::new(ScriptedHttpClient::new());
	let proxy = Url::parse("https://proxy.example.com/proxy.ashx").expect("Proxy URL should parse.");

	http.respond_json(RestMethod::Post, "/proxy.ashx", &[&token_body(
		"proxied",
		time::Duration::hours(1),
	)]);

	let token = scripted_acquirer(&http)
		.with_proxy(proxy)
		.admin_generate_token(&Credentials::new("gis", "pw"))
		.await
		.expect("Proxied admin request should succeed.");

	assert_eq!(token.secret().expose(), "proxied");

	let request = &http.requests()[0];

	assert_eq!(request.url.query(), Some("https://gis.example.com/arcgis/admin/generateToken"));
}
