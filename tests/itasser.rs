mod common;

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

use assert_matches::assert_matches;

use itasser_miner::error::MinerError;
use itasser_miner::itasser::{ItasserHttpClient, ResultsClient};

use common::{id, mvk_archive, temp_workspace};

/// Serves `connections` requests in order. A request whose path
/// mentions `S404` gets a 404, anything else gets `body`.
fn serve(body: Vec<u8>, connections: usize) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let mut paths = Vec::new();
        for stream in listener.incoming().take(connections) {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }
            let path = request_line
                .split_whitespace()
                .nth(1)
                .unwrap_or_default()
                .to_string();
            let (status, content) = if path.contains("S404") {
                ("404 Not Found", b"<html>not here</html>".to_vec())
            } else {
                ("200 OK", body.clone())
            };
            let mut response = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                content.len()
            )
            .into_bytes();
            response.extend(content);
            // The client may hang up early on an error status.
            let _ = stream.write_all(&response);
            let _ = stream.flush();
            paths.push(path);
        }
        paths
    });
    (base_url, handle)
}

#[test]
fn download_persists_body_and_maps_status_errors() {
    let (_temp, workspace) = temp_workspace();
    let body = mvk_archive();
    let (base_url, server) = serve(body.clone(), 2);
    let client = ItasserHttpClient::new(&base_url).unwrap();

    let missing = workspace.archive_path(&id("S404"));
    let err = client.download(&id("S404"), &missing).unwrap_err();
    assert_matches!(err, MinerError::ItasserStatus { status: 404, .. });
    assert_eq!(err.to_string(), "HTTP Error 404: Not Found");
    assert!(!missing.as_std_path().exists());

    let found = workspace.archive_path(&id("S1"));
    client.download(&id("S1"), &found).unwrap();
    assert_eq!(std::fs::read(found.as_std_path()).unwrap(), body);

    let mut names = std::fs::read_dir(workspace.archive_dir().as_std_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, vec!["S1.tar.bz2"]);

    let paths = server.join().unwrap();
    assert_eq!(
        paths,
        vec!["/S404/S404_results.tar.bz2", "/S1/S1_results.tar.bz2"]
    );
}
