use super::non_empty as non_empty_impl;
use super::test_ollama_connection as test_ollama_connection_impl;
use super::*;

#[test]
fn non_empty() {
    assert!(non_empty_impl(&"all-minilm".to_string()).is_ok());
    assert!(non_empty_impl(&String::new()).is_err());
    assert!(non_empty_impl(&"   ".to_string()).is_err());
}

#[test]
fn unreachable_ollama_fails_connection_test() {
    let mut config = Config::default();
    config.ollama.host = "127.0.0.1".to_string();
    config.ollama.port = 9;

    assert!(!test_ollama_connection_impl(&config));
}
