pub mod cryptopay_client;
