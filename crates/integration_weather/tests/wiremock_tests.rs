//! Integration tests for the weather and location clients using wiremock

use integration_weather::{
    IpinfoClient, IpinfoCredentials, LocationClient, LocationConfig, OpenWeatherClient,
    OpenWeatherCredentials, WeatherClient, WeatherConfig, WeatherError,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn weather_client(mock_server: &MockServer) -> OpenWeatherClient {
    let config = WeatherConfig {
        base_url: mock_server.uri(),
        timeout_secs: 5,
        ..WeatherConfig::default()
    };
    #[allow(clippy::expect_used)]
    OpenWeatherClient::new(config).expect("Failed to create client")
}

fn location_client(mock_server: &MockServer) -> IpinfoClient {
    let config = LocationConfig {
        base_url: mock_server.uri(),
        timeout_secs: 5,
    };
    #[allow(clippy::expect_used)]
    IpinfoClient::new(config).expect("Failed to create client")
}

fn key() -> OpenWeatherCredentials {
    OpenWeatherCredentials {
        api_key: "owm-key".into(),
    }
}

fn one_call_body() -> serde_json::Value {
    serde_json::json!({
        "lat": 41.85,
        "lon": -87.65,
        "timezone": "America/Chicago",
        "timezone_offset": -18000,
        "current": {
            "dt": 1_717_243_200,
            "sunrise": 1_717_237_000,
            "sunset": 1_717_291_000,
            "temp": 71.6,
            "humidity": 40,
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}]
        },
        "daily": [
            {
                "dt": 1_717_261_200,
                "temp": {"day": 75.0, "min": 58.4, "max": 77.6},
                "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}]
            }
        ]
    })
}

#[tokio::test]
async fn test_one_call_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .and(query_param("appid", "owm-key"))
        .and(query_param("units", "imperial"))
        .and(query_param("lat", "41.85"))
        .respond_with(ResponseTemplate::new(200).set_body_json(one_call_body()))
        .mount(&mock_server)
        .await;

    let call = weather_client(&mock_server)
        .one_call(&key(), 41.85, -87.65)
        .await
        .unwrap();
    assert_eq!(call.timezone_offset, -18000);
    assert!((call.current.temp - 71.6).abs() < f64::EPSILON);
    assert_eq!(call.current.primary().unwrap().description, "light rain");
    assert_eq!(call.daily.len(), 1);
    assert!((call.daily[0].temp.max - 77.6).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_one_call_rejected_key() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key."
        })))
        .mount(&mock_server)
        .await;

    let err = weather_client(&mock_server)
        .one_call(&key(), 41.85, -87.65)
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::Unauthorized(ref body) if body.contains("Invalid API key")));
}

#[tokio::test]
async fn test_one_call_rate_limited() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let err = weather_client(&mock_server)
        .one_call(&key(), 41.85, -87.65)
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::RateLimitExceeded));
}

#[tokio::test]
async fn test_one_call_out_of_range_is_not_sent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(one_call_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = weather_client(&mock_server)
        .one_call(&key(), 123.0, -87.65)
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::InvalidCoordinates));
}

#[tokio::test]
async fn test_one_call_garbage_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let err = weather_client(&mock_server)
        .one_call(&key(), 41.85, -87.65)
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::ParseError(_)));
}

#[tokio::test]
async fn test_own_details_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .and(query_param("token", "ipinfo-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": "203.0.113.7",
            "city": "Chicago",
            "region": "Illinois",
            "country": "US",
            "loc": "41.8500,-87.6500",
            "org": "AS7922 Comcast Cable Communications, LLC",
            "postal": "60601",
            "timezone": "America/Chicago"
        })))
        .mount(&mock_server)
        .await;

    let details = location_client(&mock_server)
        .own_details(&IpinfoCredentials {
            token: "ipinfo-token".into(),
        })
        .await
        .unwrap();
    assert_eq!(details.city.as_deref(), Some("Chicago"));
    assert_eq!(details.coordinates(), Some((41.85, -87.65)));
    assert!(details.hostname.is_none());
}

#[tokio::test]
async fn test_own_details_bad_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&mock_server)
        .await;

    let err = location_client(&mock_server)
        .own_details(&IpinfoCredentials {
            token: "wrong".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::Unauthorized(_)));
}
