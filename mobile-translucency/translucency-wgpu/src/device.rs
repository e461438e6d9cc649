//! Headless device creation for tools and tests.

/// Request a device from the default adapter, no surface. Errors when no adapter is available.
pub fn request_headless_device() -> Result<(wgpu::Device, wgpu::Queue), String> {
    pollster::block_on(async {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok_or_else(|| "no wgpu adapter".to_string())?;
        log::info!("adapter: {:?}", adapter.get_info().name);
        adapter
            .request_device(
                &wgpu::DeviceDescriptor { label: Some("translucency_device"), ..Default::default() },
                None,
            )
            .await
            .map_err(|e| format!("request_device: {e}"))
    })
}
