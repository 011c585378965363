/// Device replies start with an ASCII acknowledge digit followed by a
/// CARRIAGE RETURN (0x0d). For queries returning data, the payload line
/// follows the acknowledge, terminated by another CARRIAGE RETURN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Success(Option<ResponsePayload>), // 0
    SyntaxError,                      // 1
    ExecutionError,                   // 2
    SynchronizationError,             // 3
    CommunicationsError,              // 4
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    Measurement(String),
}
