#![allow(dead_code)]

use futures::executor::block_on;
use http::Method;
use serde_json::{json, Value};
use specrouter::dispatcher::{Controllers, HandlerRequest, HandlerResponse, HandlerResult};
use specrouter::error::HttpError;
use specrouter::server::{AppService, RouterOptions};
use specrouter::spec::{load_spec_str, ApiDocument};

pub const PETSTORE: &str = r##"
swagger: "2.0"
info:
  title: Swagger Petstore
  version: 1.0.0
basePath: /v1
consumes:
  - application/json
produces:
  - application/json
paths:
  /pets:
    get:
      operationId: listPets
      parameters:
        - name: limit
          in: query
          type: integer
    post:
      operationId: createPets
      parameters:
        - name: pet
          in: body
          required: true
          schema:
            $ref: "#/definitions/NewPet"
  /pets/mine:
    get:
      operationId: listMyPets
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        type: string
    get:
      operationId: showPetById
    put:
      operationId: updatePet
      parameters:
        - name: pet
          in: body
          schema:
            type: object
            properties:
              name:
                type: string
              tag:
                type: string
    delete:
      operationId: deletePet
definitions:
  NewPet:
    type: object
    required:
      - name
    properties:
      name:
        type: string
      tag:
        type: string
"##;

pub fn petstore() -> ApiDocument {
    load_spec_str(PETSTORE).unwrap()
}

fn echo(req: HandlerRequest) -> HandlerResult {
    Ok(HandlerResponse::ok(json!({
        "handler": req.handler_name,
        "params": req.path_params_map(),
        "query": req.query_params_map(),
        "body": req.body,
    })))
}

/// Controllers for every Pet Store operation. `deletePet` fails for id `0`
/// and panics for id `boom`.
pub fn pet_controllers() -> Controllers {
    Controllers::new()
        .with_sync("listPets", echo)
        .with_sync("listMyPets", echo)
        .with_sync("showPetById", echo)
        .with_sync("updatePet", echo)
        .with("createPets", |req: HandlerRequest| async move {
            Ok::<_, HttpError>(HandlerResponse::json(201, req.body.unwrap_or(Value::Null)))
        })
        .with_sync("deletePet", |req: HandlerRequest| -> HandlerResult {
            match req.get_path_param("petId") {
                Some("0") => Err(HttpError::from_status(409, "pet 0 is protected")
                    .with_field("petId", "0")),
                Some("boom") => panic!("controller exploded"),
                _ => Ok(HandlerResponse::no_content()),
            }
        })
}

pub fn service() -> AppService {
    service_with(RouterOptions::default())
}

pub fn service_with(options: RouterOptions) -> AppService {
    AppService::build(&petstore(), &pet_controllers(), options).unwrap()
}

pub fn call(service: &AppService, req: HandlerRequest) -> HandlerResponse {
    block_on(service.handle(req))
}

pub fn get(service: &AppService, target: &str) -> HandlerResponse {
    call(service, HandlerRequest::new(Method::GET, target))
}

pub fn send_json(
    service: &AppService,
    method: Method,
    target: &str,
    body: &Value,
) -> HandlerResponse {
    call(service, HandlerRequest::new(method, target).with_json(body))
}

pub mod test_server {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::Once;
    use std::time::Duration;

    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    pub fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {e:?}"),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// `(status, headers, body)` of a raw HTTP/1.1 response.
    pub fn parse_response(resp: &str) -> (u16, Vec<(String, String)>, String) {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        (status, headers, body.to_string())
    }
}
