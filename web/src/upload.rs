use gloo::file::File;
use gloo::file::futures::read_as_bytes;
use unlockwall_core::UnlockError;
use web_sys::HtmlInputElement;

/// Takes the chosen file out of the input, clearing it so choosing the same file again fires another change.
pub(crate) fn take_file(input: &HtmlInputElement) -> Option<File> {
    let file = input.files().and_then(|files| files.get(0)).map(File::from);
    input.set_value("");
    file
}

pub(crate) async fn read_file(file: File) -> Result<Vec<u8>, UnlockError> {
    log::debug!("reading {:?}, {} bytes", file.name(), file.size());
    read_as_bytes(&file)
        .await
        .map_err(|err| UnlockError::Read(err.to_string()))
}
