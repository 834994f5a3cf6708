pub mod portal_server;
